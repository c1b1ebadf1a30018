//! Decoder configuration.

/// Configuration consumed by the decoder. All flags default to the
/// permissive behavior the original implementation exhibited; a caller that
/// wants stricter ATC-grade validation opts in field by field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CodecPolicy {
    /// Emit `log::trace!` lines describing each decoded bitfield.
    /// Observability only: never affects decoded values.
    pub verbose: bool,
    /// Fail with [`crate::decoder::Error::MissingMandatory`] when a clear
    /// FSPEC bit's UAP slot is marked mandatory. When `false` (the
    /// default), such bits are silently tolerated.
    pub fail_on_missing_mandatory: bool,
    /// Fail [`crate::codec::CategoryCodecBuilder`]/field construction on an
    /// unrecognised unit string rather than silently falling back to
    /// [`crate::bitfield::Units::None`].
    pub fail_on_unknown_unit: bool,
}

/// Build a [`CodecPolicy`] by overriding only the flags that matter to the
/// caller; all others keep their [`Default`] value.
///
/// ```
/// use asterix_codec::policy::policy_with;
/// let policy = policy_with(|p| p.verbose = true);
/// assert!(policy.verbose);
/// assert!(!policy.fail_on_missing_mandatory);
/// ```
pub fn policy_with(configure: impl FnOnce(&mut CodecPolicy)) -> CodecPolicy {
    let mut policy = CodecPolicy::default();
    configure(&mut policy);
    policy
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy_is_fully_permissive() {
        let policy = CodecPolicy::default();
        assert!(!policy.verbose);
        assert!(!policy.fail_on_missing_mandatory);
        assert!(!policy.fail_on_unknown_unit);
    }

    #[test]
    fn policy_with_overrides_one_field() {
        let policy = policy_with(|p| p.fail_on_missing_mandatory = true);
        assert!(policy.fail_on_missing_mandatory);
        assert!(!policy.verbose);
    }
}
