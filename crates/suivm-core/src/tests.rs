use semver::Version;

use super::*;

fn tag(input: &str) -> ReleaseTag {
    ReleaseTag::parse(input).expect("tag should parse")
}

#[test]
fn parse_release_tag() {
    let parsed = tag("testnet-v1.40.1");
    assert_eq!(parsed.environment(), Environment::Testnet);
    assert_eq!(parsed.version(), &Version::new(1, 40, 1));
    assert_eq!(parsed.to_string(), "testnet-v1.40.1");
}

#[test]
fn release_tag_rejects_malformed_inputs() {
    for input in [
        "",
        "testnet",
        "testnet-1.40.1",
        "testnet-v1.40",
        "testnet-v1.40.1-rc1",
        "staging-v1.40.1",
        "Testnet-v1.40.1",
        "v1.40.1",
    ] {
        let err = ReleaseTag::parse(input).expect_err("input must be rejected");
        assert_eq!(
            err,
            SuivmError::InvalidReleaseTag {
                tag: input.to_string()
            },
            "unexpected error for {input:?}"
        );
    }
}

#[test]
fn parse_for_rejects_tag_from_other_environment() {
    let err = ReleaseTag::parse_for(Environment::Mainnet, "testnet-v1.40.1")
        .expect_err("environment mismatch must be rejected");
    assert!(matches!(err, SuivmError::InvalidReleaseTag { .. }));

    let ok = ReleaseTag::parse_for(Environment::Testnet, "testnet-v1.40.1")
        .expect("matching environment must parse");
    assert_eq!(ok.environment(), Environment::Testnet);
}

#[test]
fn release_tags_order_numerically() {
    let mut tags = vec![
        tag("devnet-v1.9.0"),
        tag("devnet-v1.10.0"),
        tag("devnet-v1.9.12"),
    ];
    tags.sort();
    let rendered = tags.iter().map(ToString::to_string).collect::<Vec<_>>();
    assert_eq!(
        rendered,
        vec!["devnet-v1.9.0", "devnet-v1.9.12", "devnet-v1.10.0"]
    );
}

#[test]
fn artifact_key_encodes_canonical_name() {
    let key = ArtifactKey::new(tag("testnet-v1.40.1"), Platform::Ubuntu, Arch::X86_64);
    assert_eq!(key.encode(), "sui-testnet-v1.40.1-ubuntu-x86_64");
    assert_eq!(
        key.archive_file_name(),
        "sui-testnet-v1.40.1-ubuntu-x86_64.tgz"
    );
    assert_eq!(key.environment(), Environment::Testnet);
}

#[test]
fn artifact_key_decode_recovers_every_component() {
    let key = ArtifactKey::decode("sui-mainnet-v1.39.3-macos-arm64").expect("must decode");
    assert_eq!(key.tag, tag("mainnet-v1.39.3"));
    assert_eq!(key.platform, Platform::Macos);
    assert_eq!(key.arch, Arch::Arm64);
    assert_eq!(key.encode(), "sui-mainnet-v1.39.3-macos-arm64");
}

#[test]
fn artifact_key_decode_rejects_malformed_names() {
    for name in [
        "sui-testnet-v1.40.1-ubuntu",
        "testnet-v1.40.1-ubuntu-x86_64",
        "sui-testnet-v1.40.1-linux-x86_64",
        "sui-testnet-v1.40.1-ubuntu-amd64",
        "sui-testnet-1.40.1-ubuntu-x86_64",
        "sui-unknown-v1.40.1-ubuntu-x86_64",
        "sui-testnet-v1.40.1-ubuntu-x86_64.tgz",
        "notes",
    ] {
        let err = ArtifactKey::decode(name).expect_err("name must be rejected");
        assert_eq!(
            err,
            SuivmError::MalformedArtifactKey {
                name: name.to_string()
            }
        );
    }
}

#[test]
fn platform_and_arch_accept_aliases() {
    assert_eq!(Platform::parse("linux"), Some(Platform::Ubuntu));
    assert_eq!(Platform::parse("Darwin"), Some(Platform::Macos));
    assert_eq!(Platform::parse("win"), Some(Platform::Windows));
    assert_eq!(Platform::parse("solaris"), None);
    assert_eq!(Arch::parse("amd64"), Some(Arch::X86_64));
    assert_eq!(Arch::parse("ARM64"), Some(Arch::Arm64));
    assert_eq!(Arch::parse("riscv64"), None);
}

#[test]
fn from_str_reports_typed_errors() {
    let err = "staging"
        .parse::<Environment>()
        .expect_err("unknown environment must fail");
    assert_eq!(
        err.to_string(),
        "unknown environment 'staging'; supported: mainnet, testnet, devnet"
    );
    assert!(matches!(
        "sparc".parse::<Arch>(),
        Err(SuivmError::UnknownArch { .. })
    ));
}

#[test]
fn executable_name_adds_exe_on_windows_only() {
    assert_eq!(Platform::Windows.executable_name("sui"), "sui.exe");
    assert_eq!(Platform::Ubuntu.executable_name("sui"), "sui");
}

#[test]
fn typed_error_survives_anyhow_context() {
    let err = anyhow::Error::new(std::io::Error::other("connection reset"))
        .context(SuivmError::NoReleasesFound {
            environment: Environment::Devnet,
        })
        .context("while listing versions");
    assert_eq!(
        err.downcast_ref::<SuivmError>(),
        Some(&SuivmError::NoReleasesFound {
            environment: Environment::Devnet
        })
    );
}
