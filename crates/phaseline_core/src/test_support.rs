pub(crate) fn assert_err_contains<T: std::fmt::Debug>(result: anyhow::Result<T>, needle: &str) {
    let err = result.expect_err("expected error");
    let message = format!("{err}");
    assert!(
        message.contains(needle),
        "expected error to contain \"{needle}\", got \"{message}\""
    );
}
