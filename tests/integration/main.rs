mod api_tests;
mod common;
mod http_api;
mod postgres;
