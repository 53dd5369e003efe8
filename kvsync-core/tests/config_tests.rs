//! Credential resolution from current and legacy environment names.

use std::collections::HashMap;

use kvsync_core::{Auth, ConfigError, Credentials};
use rstest::rstest;

fn resolve(vars: &[(&str, &str)]) -> Result<Credentials, ConfigError> {
    let env: HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    Credentials::from_lookup(|name| env.get(name).cloned())
}

#[test]
fn token_auth_from_current_names() {
    let creds = resolve(&[
        ("CLOUDFLARE_ACCOUNT_ID", "acc"),
        ("CLOUDFLARE_NAMESPACE_ID", "ns"),
        ("CLOUDFLARE_API_TOKEN", "tok"),
    ])
    .expect("credentials");
    assert_eq!(creds.account_id, "acc");
    assert_eq!(creds.namespace_id, "ns");
    assert_eq!(creds.auth, Auth::Token("tok".into()));
}

#[test]
fn legacy_names_are_accepted() {
    let creds = resolve(&[
        ("CF_ACCOUNT_ID", "acc"),
        ("CF_NAMESPACE_ID", "ns"),
        ("CF_AUTH_KEY", "key"),
        ("CF_AUTH_EMAIL", "me@example.com"),
    ])
    .expect("credentials");
    assert_eq!(
        creds.auth,
        Auth::Key {
            key: "key".into(),
            email: "me@example.com".into()
        }
    );
}

#[test]
fn current_names_override_legacy() {
    let creds = resolve(&[
        ("CF_ACCOUNT_ID", "old"),
        ("CLOUDFLARE_ACCOUNT_ID", "new"),
        ("CF_NAMESPACE_ID", "ns"),
        ("CF_API_TOKEN", "tok"),
    ])
    .expect("credentials");
    assert_eq!(creds.account_id, "new");
}

#[test]
fn token_wins_over_key() {
    let creds = resolve(&[
        ("CLOUDFLARE_ACCOUNT_ID", "acc"),
        ("CLOUDFLARE_NAMESPACE_ID", "ns"),
        ("CLOUDFLARE_AUTH_KEY", "key"),
        ("CLOUDFLARE_API_TOKEN", "tok"),
    ])
    .expect("credentials");
    assert_eq!(creds.auth, Auth::Token("tok".into()));
}

#[rstest]
#[case(&[], vec!["CLOUDFLARE_ACCOUNT_ID", "CLOUDFLARE_NAMESPACE_ID"])]
#[case(&[("CLOUDFLARE_ACCOUNT_ID", "acc")], vec!["CLOUDFLARE_NAMESPACE_ID"])]
#[case(&[("CF_NAMESPACE_ID", "ns"), ("CLOUDFLARE_ACCOUNT_ID", "")], vec!["CLOUDFLARE_ACCOUNT_ID"])]
fn missing_identifiers_are_reported(
    #[case] vars: &[(&str, &str)],
    #[case] expected: Vec<&'static str>,
) {
    let err = resolve(vars).unwrap_err();
    assert_eq!(err, ConfigError::MissingRequired(expected));
}

#[test]
fn missing_auth_is_reported() {
    let err = resolve(&[
        ("CLOUDFLARE_ACCOUNT_ID", "acc"),
        ("CLOUDFLARE_NAMESPACE_ID", "ns"),
    ])
    .unwrap_err();
    assert!(matches!(err, ConfigError::MissingAuth(_)));
    assert!(err.to_string().contains("CLOUDFLARE_API_TOKEN"));
}

#[test]
fn auth_key_without_email_is_incomplete() {
    let err = resolve(&[
        ("CLOUDFLARE_ACCOUNT_ID", "acc"),
        ("CLOUDFLARE_NAMESPACE_ID", "ns"),
        ("CLOUDFLARE_AUTH_KEY", "key"),
    ])
    .unwrap_err();
    assert_eq!(
        err,
        ConfigError::IncompleteAuth("CLOUDFLARE_AUTH_KEY", "CLOUDFLARE_AUTH_EMAIL")
    );
}
