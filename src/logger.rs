/// Observational logging consumed by the interpreter. No core behaviour
/// depends on delivery or formatting; front ends pick where the text goes.
pub trait Logger {
    fn debug(&self, message: &str);
    fn warn(&self, message: &str);
    fn error(&self, message: &str);
}

/// Routes interpreter messages to the `log` facade, so whatever logger the
/// binary installed (env_logger here) decides filtering and output.
pub struct LogFacade;

impl Logger for LogFacade {
    fn debug(&self, message: &str) {
        log::debug!("{}", message);
    }

    fn warn(&self, message: &str) {
        log::warn!("{}", message);
    }

    fn error(&self, message: &str) {
        log::error!("{}", message);
    }
}

/// Swallows everything. Keeps test output quiet.
pub struct NullLogger;

impl Logger for NullLogger {
    fn debug(&self, _message: &str) {}
    fn warn(&self, _message: &str) {}
    fn error(&self, _message: &str) {}
}
