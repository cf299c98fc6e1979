//! 用户公开资料摘要
//!
//! 资料 CRUD 属于外部协作方，这里只保留匹配核心需要的只读视图：
//! 存在性检查与会话参与者摘要。

use serde::{Deserialize, Serialize};

use crate::value_objects::UserId;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: UserId,
    pub display_name: String,
    pub avatar_url: Option<String>,
}
