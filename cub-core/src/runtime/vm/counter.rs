/// Non-negative counter that refuses to go below zero
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counter {
    value: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum CounterError {
    #[error("counter decremented below zero")]
    Underflow,
}

impl Counter {
    pub fn new(start: u64) -> Self {
        Counter { value: start }
    }

    pub fn value(&self) -> u64 {
        self.value
    }

    pub fn increment(&mut self) {
        self.value += 1;
    }

    pub fn decrement(&mut self) -> Result<(), CounterError> {
        self.value = self.value.checked_sub(1).ok_or(CounterError::Underflow)?;
        Ok(())
    }
}
