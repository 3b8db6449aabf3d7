pub mod common;

use common::MockLookup;
use minidkim::{
    header::{self, FieldName},
    signature::{CanonicalizationAlgorithm, DkimSignature, SignatureAlgorithm},
    verifier::{self, Config, VerificationStatus},
};

const PUBLIC_KEY_SPKI_BASE64: &str = "MIGfMA0GCSqGSIb3DQEBAQUAA4GNADCBiQKBgQDwIRP/UC3SBsEmGqZ9ZJW3/DkMoGeLnQg1fWn7/zYtIxN2SnFCjxOCKG9v3b4jYfcTNh5ijSsq631uBItLa7od+v/RtdC2UzJ1lWT947qR+Rcac2gbto/NMqJ0fzfVjH4OuKhitdY9tf6mcwGjaNBcWToIMmPSPDdQPNUYckcQ2QIDAQAB";

const PUBLIC_KEY_PKCS1_BASE64: &str = "MIGJAoGBAPAhE/9QLdIGwSYapn1klbf8OQygZ4udCDV9afv/Ni0jE3ZKcUKPE4Iob2/dviNh9xM2HmKNKyrrfW4Ei0truh36/9G10LZTMnWVZP3jupH5FxpzaBu2j80yonR/N9WMfg64qGK11j21/qZzAaNo0FxZOggyY9I8N1A81RhyRxDZAgMBAAE=";

/// Example from RFC 6376, appendix A.2, with public key in SPKI format.
#[test]
fn rfc_appendix_a_spki() {
    let _ = tracing_subscriber::fmt::try_init();

    let resolver = make_resolver(PUBLIC_KEY_SPKI_BASE64);

    assert!(verifier::verify(&make_message(), &resolver));
}

/// Example from RFC 6376, appendix A.2, with public key in RSAPublicKey format.
#[test]
fn rfc_appendix_a_rsa() {
    let _ = tracing_subscriber::fmt::try_init();

    let resolver = make_resolver(PUBLIC_KEY_PKCS1_BASE64);

    let result = verifier::verify_message(&make_message(), &resolver, &Config::default());

    assert_eq!(result.status, VerificationStatus::Success);
}

#[test]
fn rfc_appendix_a_signature() {
    use CanonicalizationAlgorithm::*;

    let message = make_message();
    let (headers, _) = header::split_message(&message).unwrap();

    let (_, value) = headers.find("dkim-signature").unwrap();
    let sig: DkimSignature = value.parse().unwrap();

    assert_eq!(sig.algorithm, SignatureAlgorithm::RsaSha256);
    assert_eq!(sig.canonicalization, (Simple, Simple).into());
    assert_eq!(sig.identity.as_deref(), Some("joe@football.example.com"));
    assert_eq!(
        &sig.signed_headers[..],
        ["Received", "From", "To", "Subject", "Date", "Message-ID"]
            .map(|n| FieldName::new(n).unwrap())
    );
    assert_eq!(sig.signature_data.len(), 128);
}

#[test]
fn rfc_appendix_a_tampered() {
    let _ = tracing_subscriber::fmt::try_init();

    let resolver = make_resolver(PUBLIC_KEY_SPKI_BASE64);

    let message = make_message().replace("Is dinner ready?", "Is dinner ready!");

    assert!(!verifier::verify(&message, &resolver));
}

fn make_resolver(key_base64: &str) -> MockLookup {
    MockLookup::with_record(
        "brisbane._domainkey.example.com.",
        format!("v=DKIM1; k=rsa; p={key_base64}"),
    )
}

// Note RFC 6376, errata 3192 and 4926!
fn make_message() -> String {
    "\
DKIM-Signature: v=1; a=rsa-sha256; s=brisbane; d=example.com;
      c=simple/simple; q=dns/txt; i=joe@football.example.com;
      h=Received : From : To : Subject : Date : Message-ID;
      bh=2jUSOH9NhtVGCQWNr9BrIAPreKQjO6Sn7XIkfJVOzv8=;
      b=AuUoFEfDxTDkHlLXSZEpZj79LICEps6eda7W3deTVFOk4yAUoqOB
        4nujc7YopdG5dWLSdNg6xNAZpOPr+kHxt1IrE+NahM6L/LbvaHut
        KVdkLLkpVaVVQPzeRDI009SO2Il5Lu7rDNH6mZckBdrIx0orEtZV
        4bmp/YzhwvcubU4=;
Received: from client1.football.example.com  [192.0.2.1]
      by submitserver.example.com with SUBMISSION;
      Fri, 11 Jul 2003 21:01:54 -0700 (PDT)
From: Joe SixPack <joe@football.example.com>
To: Suzie Q <suzie@shopping.example.net>
Subject: Is dinner ready?
Date: Fri, 11 Jul 2003 21:00:37 -0700 (PDT)
Message-ID: <20030712040037.46341.5F8J@football.example.com>

Hi.

We lost the game. Are you hungry yet?

Joe.
"
    .into()
}
