use axum_test::TestResponse;

#[track_caller]
pub(crate) fn assert_redirect(response: &TestResponse, location: &str) {
    response.assert_status_see_other();
    assert_eq!(
        response.header("location"),
        location,
        "want redirect to {location}"
    );
}
