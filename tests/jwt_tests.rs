use polling_backend::config::JwtConfig;
use polling_backend::model::user::Role;
use polling_backend::util::jwt::*;

// Helper function to create JWT utils for testing
fn create_test_jwt_utils() -> JwtTokenUtilsImpl {
    JwtTokenUtilsImpl::new(JwtConfig::default())
}

struct TestUser {
    id: String,
    email: String,
    role: Role,
}

impl TestUser {
    fn student() -> Self {
        Self { id: "65a1f0c2e4b0a1b2c3d4e5f6".to_string(), email: "student@uni.edu".to_string(), role: Role::Student }
    }
}

#[test]
fn test_token_type_as_str() {
    assert_eq!(TokenType::Access.as_str(), "access");
    assert_eq!(TokenType::Refresh.as_str(), "refresh");
}

#[test]
fn test_generate_token_pair_success() {
    let jwt_utils = create_test_jwt_utils();
    let user = TestUser::student();

    let pair = jwt_utils.generate_token_pair(&user.id, &user.email, user.role).unwrap();
    assert_ne!(pair.access_token, pair.refresh_token);
    assert_eq!(pair.token_type, "Bearer");
    assert_eq!(pair.expires_in, jwt_utils.jwt_config.access_token_expiration * 60);

    let access = jwt_utils.validate_access_token(&pair.access_token).unwrap();
    assert_eq!(access.sub, user.id);
    assert_eq!(access.email, user.email);
    assert_eq!(access.role, Role::Student);
    assert_eq!(access.token_type, "access");

    let refresh = jwt_utils.validate_refresh_token(&pair.refresh_token).unwrap();
    assert_eq!(refresh.token_type, "refresh");
    assert!(refresh.exp > access.exp);
}

#[test]
fn test_token_timestamps() {
    let jwt_utils = create_test_jwt_utils();
    let user = TestUser::student();
    let pair = jwt_utils.generate_token_pair(&user.id, &user.email, user.role).unwrap();

    let claims = jwt_utils.validate_access_token(&pair.access_token).unwrap();
    assert_eq!(claims.exp - claims.iat, jwt_utils.jwt_config.access_token_expiration * 60);
}

#[test]
fn test_jwt_jti_uniqueness() {
    let jwt_utils = create_test_jwt_utils();
    let user = TestUser::student();

    let first = jwt_utils.generate_token_pair(&user.id, &user.email, user.role).unwrap();
    let second = jwt_utils.generate_token_pair(&user.id, &user.email, user.role).unwrap();
    let a = jwt_utils.validate_access_token(&first.access_token).unwrap();
    let b = jwt_utils.validate_access_token(&second.access_token).unwrap();
    assert_ne!(a.jti, b.jti);
}

#[test]
fn test_jwt_token_tamper_detection() {
    let jwt_utils = create_test_jwt_utils();
    let user = TestUser::student();
    let token = jwt_utils.generate_token_pair(&user.id, &user.email, user.role).unwrap().access_token;
    let parts: Vec<&str> = token.split('.').collect();
    assert_eq!(parts.len(), 3);

    let tampered_tokens = vec![
        format!("tampered.{}.{}", parts[1], parts[2]),
        format!("{}.tampered.{}", parts[0], parts[2]),
        format!("{}.{}.tampered", parts[0], parts[1]),
        "invalid.token.format".to_string(),
    ];

    for tampered_token in tampered_tokens {
        let result = jwt_utils.validate_access_token(&tampered_token);
        assert!(result.is_err(), "Tampered token should be invalid: {}", tampered_token);
    }
}

#[test]
fn test_claims_role_serializes_lowercase() {
    let jwt_utils = create_test_jwt_utils();
    let pair = jwt_utils.generate_token_pair("abc", "f@uni.edu", Role::Faculty).unwrap();
    let claims = jwt_utils.validate_access_token(&pair.access_token).unwrap();

    let json = serde_json::to_value(&claims).unwrap();
    assert_eq!(json["role"], "faculty");
}

#[test]
fn test_header_extraction() {
    let jwt_utils = create_test_jwt_utils();
    assert_eq!(jwt_utils.extract_token_from_header("Bearer abc.def.ghi").unwrap(), "abc.def.ghi");
    assert!(jwt_utils.extract_token_from_header("bearer abc").is_err());
    assert!(jwt_utils.extract_token_from_header("").is_err());
    assert!(jwt_utils.extract_token_from_header("Bearer ").is_err());
}

#[test]
fn test_jwt_error_display() {
    assert_eq!(JwtError::TokenExpired.to_string(), "Token has expired");
    let err = JwtError::InvalidTokenType { expected: "access".to_string(), actual: "refresh".to_string() };
    assert_eq!(err.to_string(), "Invalid token type: expected access, got refresh");
}
