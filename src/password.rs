//! Salted password hashes in the `pbkdf2:sha256:<iterations>$<salt>$<hex>`
//! format that the web application checks logins against.

use pbkdf2::pbkdf2_hmac;
use rand::Rng;
use rand::distributions::Alphanumeric;
use sha2::Sha256;

use crate::error::{Result, ShelfkeeperError};

pub const DEFAULT_ITERATIONS: u32 = 260_000;
pub const DEFAULT_SALT_LENGTH: usize = 16;
const METHOD: &str = "pbkdf2:sha256";

pub trait PasswordHasher {
    fn hash(&self, password: &str) -> Result<String>;
}

impl<H: PasswordHasher + ?Sized> PasswordHasher for &H {
    fn hash(&self, password: &str) -> Result<String> {
        (**self).hash(password)
    }
}

#[derive(Debug, Clone)]
pub struct Pbkdf2Hasher {
    iterations: u32,
    salt_length: usize,
}

impl Pbkdf2Hasher {
    pub fn new(iterations: u32, salt_length: usize) -> Self {
        Self { iterations, salt_length }
    }
}

impl Default for Pbkdf2Hasher {
    fn default() -> Self {
        Self::new(DEFAULT_ITERATIONS, DEFAULT_SALT_LENGTH)
    }
}

impl PasswordHasher for Pbkdf2Hasher {
    fn hash(&self, password: &str) -> Result<String> {
        if self.iterations == 0 {
            return Err(ShelfkeeperError::Hashing("iterations must be positive".into()));
        }
        if self.salt_length == 0 {
            return Err(ShelfkeeperError::Hashing("salt length must be positive".into()));
        }
        let salt: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(self.salt_length)
            .map(char::from)
            .collect();
        let digest = derive(password, &salt, self.iterations);
        Ok(format!("{METHOD}:{}${salt}${digest}", self.iterations))
    }
}

fn derive(password: &str, salt: &str, iterations: u32) -> String {
    let mut key = [0u8; 32];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), salt.as_bytes(), iterations, &mut key);
    hex::encode(key)
}

/// Checks a password against a stored hash. Hashes in any other format never match.
pub fn verify_password(stored: &str, password: &str) -> bool {
    let mut parts = stored.splitn(3, '$');
    let (Some(method), Some(salt), Some(digest)) = (parts.next(), parts.next(), parts.next())
    else {
        return false;
    };
    let Some(iterations) = method
        .strip_prefix(METHOD)
        .and_then(|rest| rest.strip_prefix(':'))
        .and_then(|count| count.parse::<u32>().ok())
    else {
        return false;
    };
    iterations > 0 && derive(password, salt, iterations) == digest
}
