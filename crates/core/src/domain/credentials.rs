use secrecy::SecretString;

/// Back-office account credentials. The password never appears in `Debug`
/// output or logs; it is exposed only while the login body is rendered.
#[derive(Clone, Debug)]
pub struct Credentials {
    pub username: String,
    pub password: SecretString,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self { username: username.into(), password: SecretString::from(password.into()) }
    }
}
