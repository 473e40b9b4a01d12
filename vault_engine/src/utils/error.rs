use candid::CandidType;
use serde::Deserialize;

/// Vault engine result
pub type VaultResult<T> = Result<T, VaultError>;

/// Vault engine errors
///
/// Every error aborts the operation that raised it. The variant is surfaced to the
/// caller as-is so it can tell "try a smaller amount" apart from "not authorized".
#[derive(Clone, CandidType, Debug, Deserialize, PartialEq)]
pub enum VaultError {
    /// The caller does not hold the role required by the operation
    PermissionDenied,
    /// The operation requires the vault to be unpaused
    VaultPaused,
    /// Deposits are blocked while the emergency shutdown bit is set
    VaultEmergencyShutdown,
    /// The deposit is smaller than `minimumDepositValueUT`
    BelowMinimumDeposit,
    /// The deposit would push the account over `userDepositCapUT`
    ExceedsUserDepositCap,
    /// The deposit would push the vault over `totalValueLockedLimitUT`
    ExceedsTotalValueLockedLimit,
    /// The caller's merkle proof does not resolve to the current whitelist root
    NotWhitelisted,
    /// Shares are outstanding but the pool holds no value to price them against
    ZeroVaultValue,
    /// The account does not own enough shares
    InsufficientShares,
    /// Shares cannot be sent to the vault's own address
    TransferToVaultItself,
    /// The deposit authorization deadline has passed
    ExpiredAuthorization,
    /// The deposit authorization signature was rejected by the token
    InvalidAuthorizationSignature,
    /// Paired-array arguments have different lengths
    LengthMismatch,
    /// The risk profile code is not registered
    UnknownRiskProfileCode,
    /// The risk profile code is already registered
    RiskProfileAlreadyExists,
    /// The vault's underlying tokens hash is not mapped in the registry
    UnknownTokensHash,
    /// The tokens hash is already mapped to a token list
    TokenHashAlreadyMapped,
    /// A configuration field value does not fit its bit width
    FieldOverflow(String),
    /// A configured fee is larger than the amount it is charged on
    FeeExceedsAmount,
    /// Strategies need at least one step
    EmptyStrategy,
    /// No next strategy has been designated for the rebalance
    NoStrategyDesignated,
    /// The strategy hash does not match the vault's current strategy
    StrategyMismatch,
    /// The operation deadline has passed
    DeadlineExpired,
    /// The swap returned less than the requested minimum
    SlippageExceeded,
    /// The reward token is the underlying token or a strategy position token
    InvalidRewardToken,
    /// The swap path does not start at the reward token or end at the underlying token
    InvalidSwapPath,
    /// The vault value moved more than `maxVaultValueJumpPct` within a block
    VaultValueJumpExceeded,
    /// The strategy is not admissible under the vault's risk profile
    RiskProfileViolation,
    /// No adapter is registered for the pool
    UnknownAdapter,
    /// An adapter call failed
    AdapterFailure(String),
    /// A token transfer failed
    TokenTransferFailed(String),
    /// A low-level administrative call failed
    CallFailed(String),
    /// Decoding issue
    DecodingError(String),
    /// Arithmetic error
    Arithmetic(String),
    /// Unknown/Custom error
    Custom(String),
}

pub fn arithmetic_err<S: AsRef<str>>(s: S) -> VaultError {
    VaultError::Arithmetic(s.as_ref().to_string())
}

pub fn field_overflow<S: AsRef<str>>(field: S) -> VaultError {
    VaultError::FieldOverflow(field.as_ref().to_string())
}
