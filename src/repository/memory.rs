//! In-memory storage backend.
//!
//! Every logical operation runs under one async mutex, which gives the same
//! all-or-nothing and no-oversell guarantees as the transactional PostgreSQL
//! backend. Used for development (`database.backend = "memory"`) and tests.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{
    books::{availability_conflict, book_not_found, BooksRepository},
    loans::{loan_not_found, LoansRepository},
    members::{duplicate_email, member_not_found, MembersRepository},
    returns::{already_returned, loan_still_open, return_exists, return_not_found, ReturnsRepository},
};
use crate::{
    error::{AppError, AppResult},
    models::{
        book::{Book, CreateBook, UpdateBook},
        loan::{CreateLoan, Loan, LoanPatch, LoanQuery, LoanStatus},
        loan_return::{CreateReturn, LoanReturn, ReturnPatch},
        member::{Member, MemberChanges, NewMember},
    },
};

#[derive(Debug, Default)]
struct Tables {
    books: BTreeMap<i32, Book>,
    members: BTreeMap<i32, Member>,
    loans: BTreeMap<i32, Loan>,
    returns: BTreeMap<i32, LoanReturn>,
    last_book_id: i32,
    last_member_id: i32,
    last_loan_id: i32,
    last_return_id: i32,
}

impl Tables {
    fn adjust_availability(&mut self, id: i32, delta: i32) -> AppResult<Book> {
        let book = self.books.get_mut(&id).ok_or_else(|| book_not_found(id))?;
        let next = book
            .shifted_availability(delta)
            .ok_or_else(|| availability_conflict(id, delta))?;
        book.available_copies = next;
        Ok(book.clone())
    }

    fn has_open_loans(&self, predicate: impl Fn(&Loan) -> bool) -> bool {
        self.loans.values().any(|l| l.is_open() && predicate(l))
    }

    fn find_email(&self, email: &str) -> impl Iterator<Item = &Member> {
        // Same folding as the `LOWER(email)` index, non-ASCII included.
        let wanted = email.to_lowercase();
        self.members
            .values()
            .filter(move |m| m.email.to_lowercase() == wanted)
    }

    fn email_taken(&self, email: &str, except: Option<i32>) -> bool {
        self.find_email(email).any(|m| Some(m.id) != except)
    }

    /// Deleting a loan takes its return record with it, like the FK cascade
    fn remove_loans(&mut self, predicate: impl Fn(&Loan) -> bool) {
        let doomed: Vec<i32> = self
            .loans
            .values()
            .filter(|l| predicate(l))
            .map(|l| l.id)
            .collect();
        for id in doomed {
            self.loans.remove(&id);
            self.returns.retain(|_, r| r.loan_id != id);
        }
    }
}

/// Process-local store shared by the four repository traits
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BooksRepository for MemoryStore {
    async fn list(&self) -> AppResult<Vec<Book>> {
        Ok(self.tables.lock().await.books.values().cloned().collect())
    }

    async fn get_by_id(&self, id: i32) -> AppResult<Book> {
        let tables = self.tables.lock().await;
        tables.books.get(&id).cloned().ok_or_else(|| book_not_found(id))
    }

    async fn create(&self, data: &CreateBook) -> AppResult<Book> {
        let mut tables = self.tables.lock().await;
        tables.last_book_id += 1;
        let book = Book {
            id: tables.last_book_id,
            title: data.title.clone(),
            author: data.author.clone(),
            publish_date: data.publish_date,
            genre: data.genre.clone(),
            total_copies: data.total_copies,
            available_copies: data.total_copies,
        };
        tables.books.insert(book.id, book.clone());
        Ok(book)
    }

    async fn update(&self, id: i32, data: &UpdateBook) -> AppResult<Book> {
        let mut tables = self.tables.lock().await;
        let book = tables.books.get_mut(&id).ok_or_else(|| book_not_found(id))?;

        if let Some(total) = data.total_copies {
            let available = book.available_copies + (total - book.total_copies);
            if available < 0 {
                return Err(AppError::Conflict(format!(
                    "Book {} has {} copies on loan, more than the requested total",
                    id,
                    book.on_loan()
                )));
            }
            book.total_copies = total;
            book.available_copies = available;
        }
        if let Some(ref title) = data.title {
            book.title = title.clone();
        }
        if let Some(ref author) = data.author {
            book.author = author.clone();
        }
        if let Some(publish_date) = data.publish_date {
            book.publish_date = publish_date;
        }
        if let Some(ref genre) = data.genre {
            book.genre = genre.clone();
        }
        Ok(book.clone())
    }

    async fn delete(&self, id: i32) -> AppResult<()> {
        let mut tables = self.tables.lock().await;
        if !tables.books.contains_key(&id) {
            return Err(book_not_found(id));
        }
        if tables.has_open_loans(|l| l.book_id == id) {
            return Err(AppError::Conflict(format!("Book {} still has open loans", id)));
        }
        tables.books.remove(&id);
        tables.remove_loans(|l| l.book_id == id);
        Ok(())
    }

    async fn adjust_availability(&self, id: i32, delta: i32) -> AppResult<Book> {
        self.tables.lock().await.adjust_availability(id, delta)
    }
}

#[async_trait]
impl MembersRepository for MemoryStore {
    async fn list(&self) -> AppResult<Vec<Member>> {
        Ok(self.tables.lock().await.members.values().cloned().collect())
    }

    async fn get_by_id(&self, id: i32) -> AppResult<Member> {
        let tables = self.tables.lock().await;
        tables.members.get(&id).cloned().ok_or_else(|| member_not_found(id))
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<Member>> {
        let tables = self.tables.lock().await;
        let found = tables.find_email(email).next().cloned();
        Ok(found)
    }

    async fn create(&self, data: &NewMember) -> AppResult<Member> {
        let mut tables = self.tables.lock().await;
        if tables.email_taken(&data.email, None) {
            return Err(duplicate_email(&data.email));
        }
        tables.last_member_id += 1;
        let member = Member {
            id: tables.last_member_id,
            name: data.name.clone(),
            email: data.email.clone(),
            password_hash: data.password_hash.clone(),
            membership_date: data.membership_date,
        };
        tables.members.insert(member.id, member.clone());
        Ok(member)
    }

    async fn update(&self, id: i32, data: &MemberChanges) -> AppResult<Member> {
        let mut tables = self.tables.lock().await;
        if !tables.members.contains_key(&id) {
            return Err(member_not_found(id));
        }
        if let Some(ref email) = data.email {
            if tables.email_taken(email, Some(id)) {
                return Err(duplicate_email(email));
            }
        }

        let member = tables.members.get_mut(&id).ok_or_else(|| member_not_found(id))?;
        if let Some(ref name) = data.name {
            member.name = name.clone();
        }
        if let Some(ref email) = data.email {
            member.email = email.clone();
        }
        if let Some(ref hash) = data.password_hash {
            member.password_hash = hash.clone();
        }
        if let Some(date) = data.membership_date {
            member.membership_date = date;
        }
        Ok(member.clone())
    }

    async fn delete(&self, id: i32) -> AppResult<()> {
        let mut tables = self.tables.lock().await;
        if !tables.members.contains_key(&id) {
            return Err(member_not_found(id));
        }
        if tables.has_open_loans(|l| l.member_id == id) {
            return Err(AppError::Conflict(format!("Member {} still has open loans", id)));
        }
        tables.members.remove(&id);
        tables.remove_loans(|l| l.member_id == id);
        Ok(())
    }
}

#[async_trait]
impl LoansRepository for MemoryStore {
    async fn list(&self, query: &LoanQuery) -> AppResult<Vec<Loan>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .loans
            .values()
            .filter(|l| query.matches(l))
            .cloned()
            .collect())
    }

    async fn get_by_id(&self, id: i32) -> AppResult<Loan> {
        let tables = self.tables.lock().await;
        tables.loans.get(&id).cloned().ok_or_else(|| loan_not_found(id))
    }

    async fn create(&self, data: &CreateLoan) -> AppResult<Loan> {
        let mut tables = self.tables.lock().await;
        if !tables.members.contains_key(&data.member_id) {
            return Err(member_not_found(data.member_id));
        }
        // Nothing is written when this fails.
        tables.adjust_availability(data.book_id, -1)?;

        tables.last_loan_id += 1;
        let loan = Loan {
            id: tables.last_loan_id,
            book_id: data.book_id,
            member_id: data.member_id,
            loan_date: data.loan_date,
            due_date: data.due_date,
            status: LoanStatus::Open,
        };
        tables.loans.insert(loan.id, loan.clone());
        Ok(loan)
    }

    async fn update(&self, id: i32, data: &LoanPatch) -> AppResult<Loan> {
        let mut tables = self.tables.lock().await;
        if let Some(book_id) = data.book_id {
            if !tables.books.contains_key(&book_id) {
                return Err(book_not_found(book_id));
            }
        }
        if let Some(member_id) = data.member_id {
            if !tables.members.contains_key(&member_id) {
                return Err(member_not_found(member_id));
            }
        }
        let loan = tables.loans.get_mut(&id).ok_or_else(|| loan_not_found(id))?;
        *loan = data.apply(loan);
        Ok(loan.clone())
    }

    async fn delete(&self, id: i32) -> AppResult<()> {
        let mut tables = self.tables.lock().await;
        if !tables.loans.contains_key(&id) {
            return Err(loan_not_found(id));
        }
        tables.remove_loans(|l| l.id == id);
        Ok(())
    }
}

#[async_trait]
impl ReturnsRepository for MemoryStore {
    async fn list(&self) -> AppResult<Vec<LoanReturn>> {
        Ok(self.tables.lock().await.returns.values().cloned().collect())
    }

    async fn get_by_id(&self, id: i32) -> AppResult<LoanReturn> {
        let tables = self.tables.lock().await;
        tables.returns.get(&id).cloned().ok_or_else(|| return_not_found(id))
    }

    async fn create(&self, data: &CreateReturn) -> AppResult<LoanReturn> {
        let mut tables = self.tables.lock().await;
        let loan = tables
            .loans
            .get(&data.loan_id)
            .cloned()
            .ok_or_else(|| loan_not_found(data.loan_id))?;
        if !loan.is_open() {
            return Err(already_returned(loan.id));
        }
        if tables.returns.values().any(|r| r.loan_id == loan.id) {
            return Err(return_exists(loan.id));
        }

        // Checked before any write so a failure leaves the loan open.
        tables.adjust_availability(loan.book_id, 1)?;

        if let Some(stored) = tables.loans.get_mut(&loan.id) {
            stored.status = LoanStatus::Returned;
        }
        tables.last_return_id += 1;
        let record = LoanReturn {
            id: tables.last_return_id,
            loan_id: loan.id,
            return_date: data.return_date,
            condition_note: data.condition_note.clone(),
        };
        tables.returns.insert(record.id, record.clone());
        Ok(record)
    }

    async fn update(&self, id: i32, data: &ReturnPatch) -> AppResult<LoanReturn> {
        let mut tables = self.tables.lock().await;
        if let Some(loan_id) = data.loan_id {
            let target = tables.loans.get(&loan_id).ok_or_else(|| loan_not_found(loan_id))?;
            if target.is_open() {
                return Err(loan_still_open(loan_id));
            }
            if tables
                .returns
                .values()
                .any(|r| r.loan_id == loan_id && r.id != id)
            {
                return Err(return_exists(loan_id));
            }
        }

        let record = tables.returns.get_mut(&id).ok_or_else(|| return_not_found(id))?;
        if let Some(loan_id) = data.loan_id {
            record.loan_id = loan_id;
        }
        if let Some(return_date) = data.return_date {
            record.return_date = return_date;
        }
        if let Some(ref note) = data.condition_note {
            record.condition_note = note.clone();
        }
        Ok(record.clone())
    }

    async fn delete(&self, id: i32) -> AppResult<()> {
        let mut tables = self.tables.lock().await;
        tables
            .returns
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| return_not_found(id))
    }
}
