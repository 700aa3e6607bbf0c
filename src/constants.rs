//! Simulation-wide constants and default parameters.
//!
//! Defaults describe the reference scenario of the simulator: a 13-packet
//! W-LSB window over a Gilbert-Elliott channel with a 20% mean erasure rate
//! and bad runs of 10 packets on average.

// --- Augmented state layout ---

/// Number of augmented states that do not belong to the FullContext chain
/// (NoContext-Bad, NoContext-Good, StaticContext-Bad, StaticContext-Good).
pub const NON_FULL_CONTEXT_STATES: usize = 4;

/// Index of the first FullContext state (loss counter 0) in a belief vector.
pub const FULL_CONTEXT_BASE_INDEX: usize = NON_FULL_CONTEXT_STATES;

// --- Policy file action codes ---

/// Policy action code for a Full (IR) header.
pub const POLICY_ACTION_FULL: u8 = 0;
/// Policy action code for a Minimal (SO) header.
pub const POLICY_ACTION_MINIMAL: u8 = 1;
/// Policy action code for a Partial (FO) header.
pub const POLICY_ACTION_PARTIAL: u8 = 2;

/// XML element holding one alpha vector in a policy file.
pub const POLICY_VECTOR_ELEMENT: &str = "Vector";
/// XML element grouping all alpha vectors in a policy file.
pub const POLICY_ALPHA_VECTOR_ELEMENT: &str = "AlphaVector";
/// Attribute carrying the action code of a vector.
pub const POLICY_ACTION_ATTRIBUTE: &str = "action";
/// Attribute on the alpha vector group announcing the vector length.
pub const POLICY_VECTOR_LENGTH_ATTRIBUTE: &str = "vectorLength";

// --- Model export ---

/// Default discount factor written into exported models.
pub const DEFAULT_DISCOUNT: f64 = 0.95;

// --- Numerical tolerances ---

/// Tolerance for checking that a probability vector sums to one.
pub const PROBABILITY_SUM_TOLERANCE: f64 = 1e-9;

// --- Default scenario ---

/// Default W-LSB window capacity.
pub const DEFAULT_WINDOW_CAPACITY: usize = 13;
/// Default mean erasure probability of the channel.
pub const DEFAULT_MEAN_ERASURE_RATE: f64 = 0.2;
/// Default mean length of a run of bad channel states.
pub const DEFAULT_MEAN_BAD_RUN_LENGTH: f64 = 10.0;
/// Default estimator false-alarm probability (channel good, reported bad).
pub const DEFAULT_FALSE_ALARM_RATE: f64 = 0.1;
/// Default estimator miss-detection probability (channel bad, reported good).
pub const DEFAULT_MISS_DETECTION_RATE: f64 = 0.1;
/// Default number of simulated steps per run.
pub const DEFAULT_STEPS: usize = 100;

/// Default number of steps the timer controller stays on Full headers.
pub const DEFAULT_TIMER_FULL_TO_MINIMAL: u32 = 4;
/// Default number of steps the timer controller stays on Minimal headers.
pub const DEFAULT_TIMER_MINIMAL_TO_PARTIAL: u32 = 8;
/// Default number of steps the timer controller stays on Partial headers.
pub const DEFAULT_TIMER_PARTIAL_TO_MINIMAL: u32 = 8;

// --- Efficiency accounting (bytes) ---

/// Default Full (IR) header length.
pub const DEFAULT_FULL_HEADER_LENGTH: u32 = 80;
/// Default Partial (FO) header length.
pub const DEFAULT_PARTIAL_HEADER_LENGTH: u32 = 16;
/// Default Minimal (SO) header length.
pub const DEFAULT_MINIMAL_HEADER_LENGTH: u32 = 4;
/// Default payload length carried by every packet.
pub const DEFAULT_PAYLOAD_LENGTH: u32 = 20;
