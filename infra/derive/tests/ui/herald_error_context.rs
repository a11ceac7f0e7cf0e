use herald_derive::herald_error;
use std::borrow::Cow;

#[herald_error]
pub enum DemoError {
    #[error("IO error{}: {source}", format_context(.context))]
    Io { source: std::io::Error, context: Option<Cow<'static, str>> },

    #[error("Rejected{}: {message}", format_context(.context))]
    Rejected { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

fn open() -> Result<(), DemoError> {
    Err(std::io::Error::other("disk gone")).context("Opening journal")
}

fn reject() -> Result<(), DemoError> {
    Err(DemoError::Rejected { message: "no".into(), context: None }).context("Validating")
}

fn main() {
    let err = open().unwrap_err();
    assert_eq!(err.to_string(), "IO error (Opening journal): disk gone");

    let err = reject().unwrap_err();
    assert_eq!(err.to_string(), "Rejected (Validating): no");

    let converted: DemoError = std::io::Error::other("plain").into();
    assert_eq!(converted.to_string(), "IO error: plain");
}
