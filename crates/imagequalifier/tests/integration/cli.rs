use crate::common::{OutputMode, imagequalifier, input_under_test};

const SHA: &str = "sha256:ffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffff";

#[test]
fn test_qualify() -> anyhow::Result<()> {
    insta::assert_snapshot!(
        imagequalifier()
            .rules(input_under_test("registries.rules"))
            .image("repo/busybox:v1.2.3")
            .image("repo/busybox:latest")
            .image("repo/busybox")
            .image("team/app")
            .image("nginx")
            .run()?,
        @r"
    v1.io/repo/busybox:v1.2.3
    next.io/repo/busybox:latest
    production.io/repo/busybox
    repo.io/team/app
    docker.io/nginx
    "
    );

    Ok(())
}

#[test]
fn test_qualify_digest() -> anyhow::Result<()> {
    let image = format!("nginx@{SHA}");

    assert_eq!(
        imagequalifier()
            .rules(input_under_test("registries.rules"))
            .image(&image)
            .run()?,
        format!("docker.io/{image}\n")
    );

    Ok(())
}

#[test]
fn test_already_qualified_passes_through() -> anyhow::Result<()> {
    insta::assert_snapshot!(
        imagequalifier()
            .rules(input_under_test("registries.rules"))
            .image("quay.io/team/app")
            .image("localhost:5000/busybox")
            .image("nginx")
            .run()?,
        @r"
    quay.io/team/app
    localhost:5000/busybox
    docker.io/nginx
    "
    );

    Ok(())
}

#[test]
fn test_unmatched_passes_through() -> anyhow::Result<()> {
    insta::assert_snapshot!(
        imagequalifier()
            .rules(input_under_test("no-fallback.rules"))
            .image("repo/busybox")
            .image("nginx")
            .run()?,
        @r"
    production.io/repo/busybox
    nginx
    "
    );

    Ok(())
}

#[test]
fn test_default_domain() -> anyhow::Result<()> {
    insta::assert_snapshot!(
        imagequalifier()
            .args(["--default-domain", "fallback.io"])
            .rules(input_under_test("no-fallback.rules"))
            .image("repo/busybox")
            .image("nginx")
            .image("quay.io/nginx")
            .run()?,
        @r"
    production.io/repo/busybox
    fallback.io/nginx
    quay.io/nginx
    "
    );

    // As an environment variable.
    insta::assert_snapshot!(
        imagequalifier()
            .setenv("IMAGEQUALIFIER_DEFAULT_DOMAIN", "localhost:5000")
            .rules(input_under_test("no-fallback.rules"))
            .image("nginx")
            .run()?,
        @"localhost:5000/nginx"
    );

    Ok(())
}

#[test]
fn test_invalid_default_domain() -> anyhow::Result<()> {
    let output = imagequalifier()
        .expects_failure(true)
        .args(["--default-domain", "not-a-domain"])
        .rules(input_under_test("no-fallback.rules"))
        .image("nginx")
        .run()?;

    assert!(output.contains("invalid value 'not-a-domain' for '--default-domain <DOMAIN>'"));

    Ok(())
}

#[test]
fn test_json_format() -> anyhow::Result<()> {
    insta::assert_snapshot!(
        imagequalifier()
            .args(["--format", "json"])
            .rules(input_under_test("registries.rules"))
            .image("nginx")
            .image("quay.io/team/app")
            .run()?,
        @r#"
    [
      {
        "image": "nginx",
        "domain": "docker.io",
        "qualified": "docker.io/nginx"
      },
      {
        "image": "quay.io/team/app",
        "domain": "quay.io",
        "qualified": "quay.io/team/app"
      }
    ]
    "#
    );

    insta::assert_snapshot!(
        imagequalifier()
            .args(["--format=json"])
            .rules(input_under_test("no-fallback.rules"))
            .image("nginx")
            .run()?,
        @r#"
    [
      {
        "image": "nginx",
        "domain": null,
        "qualified": "nginx"
      }
    ]
    "#
    );

    Ok(())
}

#[test]
fn test_json_format_ends_with_newline() -> anyhow::Result<()> {
    let output = imagequalifier()
        .args(["--format", "json"])
        .rules(input_under_test("no-fallback.rules"))
        .image("nginx")
        .run()?;
    assert!(output.ends_with("]\n"), "{output:?}");

    let output = imagequalifier()
        .args(["--list", "--format", "json"])
        .rules(input_under_test("no-fallback.rules"))
        .run()?;
    assert!(output.ends_with("]\n"), "{output:?}");

    Ok(())
}

#[test]
fn test_list() -> anyhow::Result<()> {
    insta::assert_snapshot!(
        imagequalifier()
            .args(["--list"])
            .rules(input_under_test("registries.rules"))
            .run()?,
        @r"
    repo/busybox	production.io
    repo/busybox:v1*	v1.io
    repo/busybox:*	next.io
    */*	repo.io
    *	docker.io
    "
    );

    insta::assert_snapshot!(
        imagequalifier()
            .args(["--list", "--format", "json"])
            .rules(input_under_test("no-fallback.rules"))
            .run()?,
        @r#"
    [
      {
        "pattern": "repo/busybox",
        "domain": "production.io"
      }
    ]
    "#
    );

    Ok(())
}

#[test]
fn test_list_conflicts_with_images() -> anyhow::Result<()> {
    let output = imagequalifier()
        .expects_failure(true)
        .args(["--list"])
        .rules(input_under_test("registries.rules"))
        .image("nginx")
        .run()?;

    assert!(output.contains("cannot be used with"));

    Ok(())
}

#[test]
fn test_images_required() -> anyhow::Result<()> {
    let output = imagequalifier()
        .expects_failure(true)
        .rules(input_under_test("registries.rules"))
        .run()?;

    assert!(output.contains("the following required arguments were not provided"));

    Ok(())
}

#[test]
fn test_invalid_image() -> anyhow::Result<()> {
    insta::assert_snapshot!(
        imagequalifier()
            .expects_failure(true)
            .rules(input_under_test("registries.rules"))
            .image("nginx")
            .image("Busybox")
            .run()?,
        @r#"
    fatal: no images were qualified
    couldn't qualify Busybox

    Caused by:
        0: invalid image "Busybox"
        1: invalid reference "Busybox": repository name must be lowercase
    "#
    );

    Ok(())
}

#[test]
fn test_overlong_qualified_reference() -> anyhow::Result<()> {
    let image = "a".repeat(250);

    let output = imagequalifier()
        .expects_failure(true)
        .rules(input_under_test("registries.rules"))
        .image(&image)
        .run()?;

    assert!(output.contains("repository name must not be more than 255 characters"));

    Ok(())
}

#[test]
fn test_verbose_logging() -> anyhow::Result<()> {
    let output = imagequalifier()
        .args(["-vv"])
        .output(OutputMode::Both)
        .rules(input_under_test("registries.rules"))
        .image("nginx")
        .run()?;

    assert!(output.contains("nginx matched *, qualifying with docker.io"));
    assert!(output.ends_with("docker.io/nginx\n"));

    Ok(())
}

#[test]
fn test_version() -> anyhow::Result<()> {
    insta::assert_snapshot!(
        imagequalifier().args(["--version"]).run()?,
        @"imagequalifier @@VERSION@@"
    );

    Ok(())
}
