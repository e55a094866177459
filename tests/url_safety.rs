//! URL validation and profile resolution against hostile inputs.

mod common;

use common::{Scripted, ScriptedTransport};
use image_provenance::security::is_hostname_blocked;
use image_provenance::{resolve_profile_image, validate, ProfileImage, ValidationError};

#[test]
fn test_blocked_address_forms() {
    for host in [
        "localhost",
        "LOCALHOST.",
        "api.localhost",
        "127.0.0.1",
        "127.1.2.3",
        "10.255.0.1",
        "172.16.0.1",
        "172.31.255.255",
        "192.168.1.1",
        "169.254.169.254",
        "0.0.0.0",
        "::1",
        "[::1]",
        "::ffff:127.0.0.1",
        "fe80::1",
        "fd00::1",
        "metadata.google.internal",
    ] {
        assert!(is_hostname_blocked(host), "{host} should be blocked");
    }

    for host in ["example.com", "172.32.0.1", "8.8.8.8", "2606:4700::1111", "10.example.com"] {
        assert!(!is_hostname_blocked(host), "{host} should be allowed");
    }
}

#[test]
fn test_validate_error_kinds() {
    assert!(matches!(
        validate("not a url"),
        Err(ValidationError::InvalidFormat { .. })
    ));
    assert!(matches!(
        validate("gopher://example.com/"),
        Err(ValidationError::UnsupportedScheme { .. })
    ));
    assert!(matches!(
        validate("https://admin@example.com/"),
        Err(ValidationError::CredentialsInUrl)
    ));
    assert!(matches!(
        validate("http://192.168.0.10:8080/a.png"),
        Err(ValidationError::HostnameBlocked { .. })
    ));

    // Decimal and hex IPv4 spellings are canonicalized by the URL parser
    assert!(validate("http://2130706433/").is_err());
    assert!(validate("http://0x7f000001/").is_err());

    let safe = validate("https://cdn.example.com/a.png?w=1").unwrap();
    assert_eq!(safe.as_str(), "https://cdn.example.com/a.png?w=1");
}

#[tokio::test]
async fn test_profile_page_pointing_at_private_image_is_blocked_later() {
    // Resolution itself only reads the page; the advertised URL still has to
    // pass validation when it is fetched.
    let transport = ScriptedTransport::new().with(
        "https://social.example/u/mallory",
        Scripted::html(r#"<meta property="og:image" content="http://10.0.0.8/avatar.png">"#),
    );

    let resolved = resolve_profile_image(&transport, "https://social.example/u/mallory").await;

    assert_eq!(
        resolved,
        ProfileImage::Found("http://10.0.0.8/avatar.png".to_string())
    );
    assert!(validate("http://10.0.0.8/avatar.png").is_err());
    assert_eq!(transport.requested_urls(), vec!["https://social.example/u/mallory"]);
}

#[tokio::test]
async fn test_json_ld_image_when_no_meta_tags() {
    let transport = ScriptedTransport::new().with(
        "https://news.example/story",
        Scripted::html(
            r#"<script type="application/ld+json">
                {"@context": "https://schema.org", "@type": "Person",
                 "image": {"@type": "ImageObject", "url": "/img/portrait.webp"}}
            </script>"#,
        ),
    );

    let resolved = resolve_profile_image(&transport, "https://news.example/story").await;

    assert_eq!(
        resolved.into_option().as_deref(),
        Some("https://news.example/img/portrait.webp")
    );
}
