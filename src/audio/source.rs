use crate::error::{PerioError, Result};

/// Trait for audio frame producers.
///
/// The pipeline only ever sees this trait, never a concrete device API.
/// Implementations deliver whatever 16-bit mono PCM samples are available;
/// the capture loop slices them into fixed-size frames.
pub trait FrameSource: Send {
    /// Start producing samples.
    fn start(&mut self) -> Result<()>;

    /// Stop producing samples and release the underlying resource.
    fn stop(&mut self) -> Result<()>;

    /// Read available samples. Returns an empty vector when nothing has
    /// accumulated yet; callers poll again after a short sleep.
    fn read_samples(&mut self) -> Result<Vec<i16>>;

    /// True once a finite source (e.g. a WAV file) has delivered all of
    /// its samples. Live sources always return false.
    fn is_exhausted(&self) -> bool {
        false
    }
}

/// Mock frame source for testing.
#[derive(Debug, Clone)]
pub struct MockFrameSource {
    is_started: bool,
    samples: Vec<i16>,
    should_fail_start: bool,
    should_fail_read: bool,
    error_message: String,
}

impl MockFrameSource {
    pub fn new() -> Self {
        Self {
            is_started: false,
            samples: vec![0i16; 1024],
            should_fail_start: false,
            should_fail_read: false,
            error_message: "mock audio error".to_string(),
        }
    }

    /// Configure the mock to return specific samples on every read.
    pub fn with_samples(mut self, samples: Vec<i16>) -> Self {
        self.samples = samples;
        self
    }

    /// Configure the mock to fail on start.
    pub fn with_start_failure(mut self) -> Self {
        self.should_fail_start = true;
        self
    }

    /// Configure the mock to fail on read.
    pub fn with_read_failure(mut self) -> Self {
        self.should_fail_read = true;
        self
    }

    pub fn is_started(&self) -> bool {
        self.is_started
    }
}

impl Default for MockFrameSource {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameSource for MockFrameSource {
    fn start(&mut self) -> Result<()> {
        if self.should_fail_start {
            Err(PerioError::AudioCapture {
                message: self.error_message.clone(),
            })
        } else {
            self.is_started = true;
            Ok(())
        }
    }

    fn stop(&mut self) -> Result<()> {
        self.is_started = false;
        Ok(())
    }

    fn read_samples(&mut self) -> Result<Vec<i16>> {
        if self.should_fail_read {
            Err(PerioError::AudioCapture {
                message: self.error_message.clone(),
            })
        } else {
            Ok(self.samples.clone())
        }
    }
}

/// Finite source that plays back a scripted sample sequence, then reports
/// exhaustion. Used to drive the pipeline deterministically in tests and
/// to back offline WAV runs.
#[derive(Debug, Clone)]
pub struct ScriptedFrameSource {
    samples: Vec<i16>,
    position: usize,
    read_size: usize,
}

impl ScriptedFrameSource {
    /// Create a scripted source that yields `read_size` samples per read.
    pub fn new(samples: Vec<i16>, read_size: usize) -> Self {
        Self {
            samples,
            position: 0,
            read_size,
        }
    }
}

impl FrameSource for ScriptedFrameSource {
    fn start(&mut self) -> Result<()> {
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        Ok(())
    }

    fn read_samples(&mut self) -> Result<Vec<i16>> {
        if self.position >= self.samples.len() {
            return Ok(Vec::new());
        }
        let end = std::cmp::min(self.position + self.read_size, self.samples.len());
        let chunk = self.samples[self.position..end].to_vec();
        self.position = end;
        Ok(chunk)
    }

    fn is_exhausted(&self) -> bool {
        self.position >= self.samples.len()
    }
}
