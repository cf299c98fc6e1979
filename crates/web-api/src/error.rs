use application::ApplicationError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
}

/// 统一错误响应：HTTP 状态码 + 稳定错误码 + 人类可读说明。
/// 错误码是客户端消费的契约，不随文案变化。
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: ErrorBody,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            body: ErrorBody {
                code,
                message: message.into(),
            },
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "UNAUTHORIZED", message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "BAD_REQUEST", message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, "FORBIDDEN", message)
    }

    pub fn internal_server_error(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", message)
    }
}

impl From<ApplicationError> for ApiError {
    fn from(error: ApplicationError) -> Self {
        use application::ApplicationError as AppErr;
        use domain::DomainError;

        match error {
            AppErr::Domain(DomainError::InvalidArgument { field, reason }) => ApiError::new(
                StatusCode::BAD_REQUEST,
                "INVALID_ARGUMENT",
                format!("{}: {}", field, reason),
            ),
            AppErr::Domain(DomainError::SelfLike) => ApiError::new(
                StatusCode::BAD_REQUEST,
                "SELF_LIKE",
                "cannot send a like to yourself",
            ),
            AppErr::Domain(DomainError::ReceiverNotFound) => ApiError::new(
                StatusCode::NOT_FOUND,
                "RECEIVER_NOT_FOUND",
                "receiver not found",
            ),
            AppErr::Domain(DomainError::UserNotFound) => {
                ApiError::new(StatusCode::NOT_FOUND, "USER_NOT_FOUND", "user not found")
            }
            AppErr::Domain(DomainError::LikeAlreadyExists(_)) => ApiError::new(
                StatusCode::CONFLICT,
                "LIKE_EXISTS",
                "like already exists for this pair",
            ),
            AppErr::Domain(DomainError::AlreadyRejectedByReceiver) => ApiError::new(
                StatusCode::CONFLICT,
                "ALREADY_REJECTED",
                "receiver has already rejected this pairing",
            ),
            AppErr::Domain(DomainError::LikeNotFound) => {
                ApiError::new(StatusCode::NOT_FOUND, "LIKE_NOT_FOUND", "like not found")
            }
            AppErr::Domain(DomainError::LikeAlreadyProcessed) => ApiError::new(
                StatusCode::CONFLICT,
                "LIKE_ALREADY_PROCESSED",
                "like has already been processed",
            ),
            AppErr::Domain(DomainError::InvalidParticipants) => ApiError::new(
                StatusCode::BAD_REQUEST,
                "INVALID_PARTICIPANTS",
                "conversation participants must be different users",
            ),
            AppErr::Domain(DomainError::ConversationExists(_)) => ApiError::new(
                StatusCode::CONFLICT,
                "CONVERSATION_EXISTS",
                "conversation already exists for this pair",
            ),
            AppErr::Domain(DomainError::ConversationNotFound) => ApiError::new(
                StatusCode::NOT_FOUND,
                "CONVERSATION_NOT_FOUND",
                "conversation not found",
            ),
            AppErr::Domain(DomainError::AlreadyUnmatched) => ApiError::new(
                StatusCode::CONFLICT,
                "ALREADY_UNMATCHED",
                "conversation is already unmatched",
            ),
            // 发送者本身是合法参与者，被拒是因为会话状态，归类为冲突
            AppErr::Domain(DomainError::ConversationUnmatched) => ApiError::new(
                StatusCode::CONFLICT,
                "CONVERSATION_UNMATCHED",
                "conversation has been unmatched",
            ),
            AppErr::Domain(DomainError::NotificationNotFound) => ApiError::new(
                StatusCode::NOT_FOUND,
                "NOTIFICATION_NOT_FOUND",
                "notification not found",
            ),
            AppErr::Domain(DomainError::NotificationAlreadyRead) => ApiError::new(
                StatusCode::CONFLICT,
                "NOTIFICATION_ALREADY_READ",
                "notification is already read",
            ),
            AppErr::Domain(DomainError::NotAuthorized) => ApiError::new(
                StatusCode::FORBIDDEN,
                "NOT_AUTHORIZED",
                "not authorized to act on this resource",
            ),
            AppErr::Repository(repo_err) => match repo_err {
                domain::RepositoryError::NotFound => ApiError::new(
                    StatusCode::NOT_FOUND,
                    "NOT_FOUND",
                    "requested resource not found",
                ),
                domain::RepositoryError::Conflict => {
                    ApiError::new(StatusCode::CONFLICT, "CONFLICT", "resource already exists")
                }
                domain::RepositoryError::Storage { message } => ApiError::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "DATABASE_ERROR",
                    format!("database error: {}", message),
                ),
            },
            AppErr::Infrastructure(message) => ApiError::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "INFRASTRUCTURE_ERROR",
                message,
            ),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}
