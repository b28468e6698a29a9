pub mod hashing;
pub mod mail;
pub mod reset;
pub mod security;
pub mod session;
pub mod totp;
