pub mod client;
pub mod mailgun;

pub use client::{EmailMessage, MailError, Mailer, SendReceipt};
pub use mailgun::MailgunMailer;
