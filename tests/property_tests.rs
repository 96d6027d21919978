/// Property-based tests using proptest
/// Tests invariants that should hold for all inputs
use proptest::prelude::*;
use std::sync::Arc;

use lead_capture_api::capture::{normalize_email, subscribe};
use lead_capture_api::mfa::{hash_backup_code, is_backup_code_shaped};
use lead_capture_api::models::{LeadStatus, NewsletterPayload};
use lead_capture_api::store::MemoryStore;
use lead_capture_api::totp;

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

fn payload(email: String) -> NewsletterPayload {
    NewsletterPayload {
        email: Some(email),
        name: None,
        interests: None,
        source: None,
    }
}

// Property: the newsletter holds one record per normalized email
proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn newsletter_keeps_one_record_per_email(
        local in "[a-zA-Z]{1,8}",
        domain in "[a-zA-Z]{1,8}",
        pad in " {0,2}",
        repeats in 1usize..4
    ) {
        let email = format!("{}@{}.com", local, domain);
        let store = Arc::new(MemoryStore::new());

        let count = runtime().block_on(async {
            for i in 0..repeats {
                let variant = if i % 2 == 0 {
                    format!("{}{}", pad, email.to_uppercase())
                } else {
                    email.clone()
                };
                let outcome = subscribe(store.as_ref(), payload(variant)).await.unwrap();
                assert_eq!(outcome.subscription().email, normalize_email(&email));
            }
            store.subscription_count().await
        });

        prop_assert_eq!(count, 1);
    }

    #[test]
    fn normalize_email_is_idempotent(email in "\\PC{0,40}") {
        let once = normalize_email(&email);
        prop_assert_eq!(normalize_email(&once), once);
    }
}

// Property: a code always verifies at the time it was generated
proptest! {
    #[test]
    fn totp_code_verifies_at_its_own_time(unix in 60u64..4_000_000_000u64) {
        let secret = totp::generate_secret();
        let code = totp::code_at(&secret, unix).unwrap();

        prop_assert!(totp::is_code_shaped(&code));
        let step = totp::verify_at(&secret, &code, unix).unwrap();
        prop_assert!(step.is_some());
        prop_assert!(step.unwrap().abs_diff(totp::time_step(unix)) <= totp::SKEW);
    }

    #[test]
    fn totp_verify_never_panics(token in "\\PC{0,12}", unix in any::<u64>()) {
        let secret = totp::generate_secret();
        let _ = totp::verify_at(&secret, &token, unix);
    }
}

// Property: backup codes hash the same regardless of case and separators
proptest! {
    #[test]
    fn backup_code_hash_ignores_case_and_dash(code in "[0-9A-F]{8}") {
        let dashed = format!("{}-{}", &code[..4], &code[4..]);
        prop_assert!(is_backup_code_shaped(&dashed));
        prop_assert_eq!(hash_backup_code(&dashed), hash_backup_code(&code.to_lowercase()));
    }
}

// Property: terminal statuses never move
proptest! {
    #[test]
    fn terminal_statuses_have_no_transitions(from in 0usize..6, to in 0usize..6) {
        let all = [
            LeadStatus::New,
            LeadStatus::Pending,
            LeadStatus::Active,
            LeadStatus::Approved,
            LeadStatus::Completed,
            LeadStatus::Rejected,
        ];
        let (from, to) = (all[from], all[to]);
        if from.is_terminal() {
            prop_assert!(!from.can_transition_to(to));
        }
        prop_assert!(!from.can_transition_to(from));
    }
}
