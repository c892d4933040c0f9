/// Exit code for rejected inputs (bad shape, out-of-range order, bad areas).
pub const EXIT_VALIDATION: u8 = 2;
/// Exit code for file read/write failures.
pub const EXIT_IO: u8 = 3;
/// Exit code for numerical failures that have no safe substitute value.
pub const EXIT_NUMERICAL: u8 = 4;

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    /// Fatal input error; no partial result accompanies it.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(EXIT_VALIDATION, message)
    }

    pub fn io(message: impl Into<String>) -> Self {
        Self::new(EXIT_IO, message)
    }

    pub fn numerical(message: impl Into<String>) -> Self {
        Self::new(EXIT_NUMERICAL, message)
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }

    pub fn is_validation(&self) -> bool {
        self.exit_code == EXIT_VALIDATION
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}
