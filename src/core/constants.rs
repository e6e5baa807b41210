//! Shared constants used across the application

pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

pub const DEFAULT_MODEL: &str = "gpt-4o-2024-05-13";

pub const DEFAULT_TEMPERATURE: f32 = 0.3;

/// Upper bound accepted by OpenAI-compatible endpoints.
pub const MAX_TEMPERATURE: f32 = 2.0;

pub const DEFAULT_MAX_TOKENS: u32 = 4096;

/// Seconds without a fragment before an in-flight stream is abandoned.
pub const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 60;

pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 15;

/// Hidden system instruction sent with every completion request. It steers
/// the model toward colorblind-friendly output and is never rendered.
pub const ACCESSIBILITY_INSTRUCTION: &str = "Please optimize any provided images for colorblind individuals by adjusting the colors to enhance visibility and distinguishability. Then, return them in the response. Alternatively, if the response includes images, ensure they have suitable visibility for colorblind people.";
