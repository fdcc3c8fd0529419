use crate::address::Address;

/// The lifecycle claims a message carries about its report.
///
/// These are caller-supplied and never verified against the external report
/// registry; the evaluator only enforces internal consistency. Production
/// deployments are expected to cross-check the claims upstream before
/// trusting them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportClaims {
    pub reporter_address: Address,
    /// The agent who has taken custody of the report, if collected.
    pub collected_by: Option<Address>,
}

/// A candidate participant: an address plus its asserted role.
#[derive(Debug, Clone)]
pub struct Participant<'a> {
    pub address: &'a Address,
    /// Asserted agent role; `isFromAgent` on writes, the `agent` query flag
    /// on reads.
    pub is_agent: bool,
}

/// Decides whether a participant may read or post in a report's
/// conversation, given the report's claimed state.
///
/// - Not yet collected: the reporter, or any address asserting the agent
///   role.
/// - Collected: access narrows to exactly the reporter and the collecting
///   agent.
///
/// Pure and stateless; evaluated per message since claims can in principle
/// differ message-to-message.
pub fn can_participate(claims: &ReportClaims, participant: &Participant<'_>) -> bool {
    if participant.address == &claims.reporter_address {
        return true;
    }

    match &claims.collected_by {
        Some(collector) => participant.address == collector,
        None => participant.is_agent,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(fill: char) -> Address {
        Address::parse(&format!("0x{}", fill.to_string().repeat(40))).unwrap()
    }

    fn open_claims() -> ReportClaims {
        ReportClaims {
            reporter_address: addr('1'),
            collected_by: None,
        }
    }

    fn collected_claims() -> ReportClaims {
        ReportClaims {
            reporter_address: addr('1'),
            collected_by: Some(addr('2')),
        }
    }

    #[test]
    fn reporter_always_participates() {
        let reporter = addr('1');
        let p = Participant { address: &reporter, is_agent: false };
        assert!(can_participate(&open_claims(), &p));
        assert!(can_participate(&collected_claims(), &p));
    }

    #[test]
    fn any_agent_participates_before_collection() {
        let agent = addr('9');
        let p = Participant { address: &agent, is_agent: true };
        assert!(can_participate(&open_claims(), &p));
    }

    #[test]
    fn non_agent_stranger_is_denied_before_collection() {
        let stranger = addr('9');
        let p = Participant { address: &stranger, is_agent: false };
        assert!(!can_participate(&open_claims(), &p));
    }

    #[test]
    fn access_narrows_after_collection() {
        let other_agent = addr('3');
        let p = Participant { address: &other_agent, is_agent: true };
        assert!(!can_participate(&collected_claims(), &p));

        let collector = addr('2');
        let p = Participant { address: &collector, is_agent: true };
        assert!(can_participate(&collected_claims(), &p));
    }

    #[test]
    fn collector_participates_even_without_asserting_the_role() {
        let collector = addr('2');
        let p = Participant { address: &collector, is_agent: false };
        assert!(can_participate(&collected_claims(), &p));
    }
}
