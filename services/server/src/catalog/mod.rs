//! 服务项目（只读）接口。

mod handlers;

pub(crate) use handlers::{get_service_handler, list_services_handler};
