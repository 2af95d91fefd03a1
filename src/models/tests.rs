#[cfg(test)]
mod tests {
    use super::super::*;
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use uuid::Uuid;

    fn create_test_share() -> ShareRequestRecord {
        ShareRequestRecord {
            id: 7,
            user_id: 42,
            credential_type: CredentialType::Transcript,
            recipient_name: Some("Admissions Office".to_string()),
            recipient_email: Some("admissions@example.edu".to_string()),
            institution_id: Some(3),
            institution_name: Some("Example Community College".to_string()),
            issued_to: Some("Jordan Student".to_string()),
            presigned_url: None,
            fingerprint: Some("ab".repeat(32)),
            share_token: Uuid::nil(),
            token_expires_at: None,
            created_at: Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_credential_type_parsing() {
        assert_eq!("transcript".parse::<CredentialType>().unwrap(), CredentialType::Transcript);
        assert_eq!("Degree-Verification".parse::<CredentialType>().unwrap(), CredentialType::DegreeVerification);
        assert_eq!(" SAR ".parse::<CredentialType>().unwrap(), CredentialType::Sar);

        let err = "diploma".parse::<CredentialType>().unwrap_err();
        assert_eq!(err.kind, "credential type");
        assert_eq!(err.value, "diploma");
    }

    #[test]
    fn test_credential_type_round_trips_through_its_name() {
        for kind in CredentialType::ALL {
            assert_eq!(kind.as_str().parse::<CredentialType>().unwrap(), kind);
            assert_eq!(serde_json::to_value(kind).unwrap(), json!(kind.as_str()));
        }
    }

    #[test]
    fn test_status_transitions() {
        use ShareStatus::*;

        assert!(Pending.can_transition_to(Sent));
        assert!(Pending.can_transition_to(Viewed));
        assert!(Sent.can_transition_to(Viewed));
        assert!(Sent.can_transition_to(Sent));

        assert!(!Sent.can_transition_to(Pending));
        assert!(!Viewed.can_transition_to(Pending));
        assert!(!Viewed.can_transition_to(Sent));

        for from in [Pending, Sent, Viewed, Failed] {
            assert!(from.can_transition_to(Failed), "{from} -> failed must be accepted");
        }
        assert!(!Failed.can_transition_to(Pending));
        assert!(!Failed.can_transition_to(Viewed));
    }

    #[test]
    fn test_allowed_predecessors() {
        use ShareStatus::*;

        assert_eq!(ShareStatus::allowed_predecessors(Pending), vec![Pending]);
        assert_eq!(ShareStatus::allowed_predecessors(Viewed), vec![Pending, Sent, Viewed]);
        assert_eq!(
            ShareStatus::allowed_predecessors(Failed),
            vec![Pending, Sent, Viewed, Failed]
        );
    }

    #[test]
    fn test_verification_result_from_share() {
        let share = create_test_share();
        let result = VerificationResult::from_share(&share);

        assert!(result.verified);
        assert_eq!(result.credential_type, Some(CredentialType::Transcript));
        assert_eq!(result.issuer.as_deref(), Some("Example Community College"));
        assert_eq!(result.recipient.as_deref(), Some("Admissions Office"));
        assert_eq!(result.issued_to.as_deref(), Some("Jordan Student"));
        assert_eq!(result.share_date, Some(share.created_at));
    }

    #[test]
    fn test_verification_result_fallbacks() {
        let mut share = create_test_share();
        share.institution_name = None;
        share.recipient_name = None;

        let result = VerificationResult::from_share(&share);
        assert_eq!(result.issuer.as_deref(), Some("3"));
        assert_eq!(result.recipient.as_deref(), Some("admissions@example.edu"));
    }

    #[test]
    fn test_not_verified_serializes_every_field() {
        let value = serde_json::to_value(VerificationResult::not_verified()).unwrap();
        assert_eq!(
            value,
            json!({
                "verified": false,
                "credential_type": null,
                "issuer": null,
                "recipient": null,
                "issued_to": null,
                "share_date": null
            })
        );
    }

    #[test]
    fn test_status_criteria_matching() {
        let record = ShareStatusRecord {
            id: 1,
            share_id: 7,
            status: ShareStatus::Sent,
            updated_at: Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap(),
            detail: None,
        };

        assert!(StatusCriteria::default().matches(&record, 42, None));

        let criteria = StatusCriteria {
            institution_id: Some(3),
            status: Some(ShareStatus::Sent),
            from: Some(record.updated_at),
            to: Some(record.updated_at),
            ..Default::default()
        };
        assert!(criteria.matches(&record, 42, Some(3)));
        assert!(!criteria.matches(&record, 42, Some(4)));
        assert!(!criteria.matches(&record, 42, None));

        let owned = StatusCriteria {
            owner_id: Some(99),
            ..Default::default()
        };
        assert!(!owned.matches(&record, 42, Some(3)));
    }

    #[test]
    fn test_share_row_translation_rejects_unknown_type() {
        let share = create_test_share();
        let row = ShareRequestRow {
            id: share.id,
            user_id: share.user_id,
            credential_type: "hologram".to_string(),
            recipient_name: None,
            recipient_email: None,
            institution_id: None,
            institution_name: None,
            issued_to: None,
            presigned_url: None,
            fingerprint: None,
            share_token: share.share_token,
            token_expires_at: None,
            created_at: share.created_at,
        };

        assert!(ShareRequestRecord::try_from(row).is_err());
    }

    #[test]
    fn test_token_expiry() {
        let mut share = create_test_share();
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        assert!(!share.token_expired_at(now));

        share.token_expires_at = Some(now);
        assert!(share.token_expired_at(now));

        share.token_expires_at = Some(Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap());
        assert!(!share.token_expired_at(now));
    }
}
