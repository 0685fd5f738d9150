use criminalintent_core::repo::global;
use criminalintent_core::RepoError;

#[test]
fn get_before_initialize_fails_without_side_effects() {
    let err = global::get().err().expect("repository must not be initialized");
    assert!(matches!(err, RepoError::Uninitialized));
    assert!(!global::is_initialized());
}
