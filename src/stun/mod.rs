pub(crate) mod attributes;
pub(crate) mod fingerprint;
pub(crate) mod integrity;
pub(crate) mod message;
pub(crate) mod textattrs;
pub(crate) mod xoraddr;
