use std::fmt;

/// Secret string used to authenticate against the analysis server.
///
/// `Debug` never prints the secret itself.
#[derive(Clone, PartialEq, Eq)]
pub struct Token(String);

impl Token {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Token {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl From<String> for Token {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Token(***)")
    }
}

/// How requests to the analysis server are authenticated.
///
/// The two mechanisms are mutually exclusive for a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerAuth {
    /// `Authorization: Bearer <user token>`
    Bearer(Token),
    /// `Cookie: JWT-SESSION=<session>` captured from the login endpoint
    Session(Token),
}

/// Username and password posted to the login endpoint.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: Token,
}
