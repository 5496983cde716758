use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
#[non_exhaustive]
pub enum Error {
    #[error("offer is missing ice-ufrag or ice-pwd")]
    ErrInvalidSdp,
    #[error("client pool is full")]
    ErrMaxClients,
    #[error("data channel is not open")]
    ErrNotConnected,
    #[error("unknown client handle")]
    ErrUnknownClient,
    #[error("host address is not a valid IPv4 address")]
    ErrInvalidAddress,

    #[error("raw is too small for a STUN message")]
    ErrStunHeaderTooSmall,
    #[error("STUN magic cookie mismatch")]
    ErrStunMagicCookieMismatch,
    #[error("STUN attribute truncated")]
    ErrStunAttributeTruncated,
    #[error("STUN attribute not found")]
    ErrAttributeNotFound,
    #[error("STUN attribute has unexpected size")]
    ErrAttributeSizeInvalid,
    #[error("MESSAGE-INTEGRITY mismatch")]
    ErrIntegrityMismatch,
    #[error("FINGERPRINT mismatch")]
    ErrFingerprintMismatch,
    #[error("FINGERPRINT must come after MESSAGE-INTEGRITY")]
    ErrFingerprintBeforeIntegrity,
    #[error("USERNAME is not of the form server:client")]
    ErrBadUsername,

    #[error("raw is smaller than the minimum length for a SCTP packet")]
    ErrPacketRawTooSmall,
    #[error("checksum mismatch theirs")]
    ErrChecksumMismatch,
    #[error("unable to parse SCTP chunk, not enough data for complete header")]
    ErrParseSctpChunkNotEnoughData,
    #[error("raw is too small for a SCTP chunk")]
    ErrChunkHeaderTooSmall,
    #[error("chunk has invalid length")]
    ErrChunkHeaderInvalidLength,
    #[error("chunk value isn't long enough for mandatory parameters")]
    ErrChunkValueNotLongEnough,
    #[error("chunk too short")]
    ErrChunkTooShort,
    #[error("SACK chunk size is not large enough to contain header")]
    ErrSackSizeNotLargeEnoughInfo,
    #[error("heartbeat is not long enough to contain heartbeat info")]
    ErrHeartbeatNotLongEnoughInfo,
    #[error("heartbeat should only have a HEARTBEAT-INFO param")]
    ErrHeartbeatParam,

    #[error("DCEP message too short")]
    ErrDcepTooShort,
    #[error("invalid DCEP message type {0}")]
    ErrDcepInvalidMessageType(u8),

    #[error("crypto failure: {0}")]
    ErrCrypto(String),
}

impl From<openssl::error::ErrorStack> for Error {
    fn from(e: openssl::error::ErrorStack) -> Self {
        Error::ErrCrypto(e.to_string())
    }
}

impl From<rcgen::RcgenError> for Error {
    fn from(e: rcgen::RcgenError) -> Self {
        Error::ErrCrypto(e.to_string())
    }
}
