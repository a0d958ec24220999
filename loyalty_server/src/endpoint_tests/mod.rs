mod auth;
mod helpers;
mod orders;
