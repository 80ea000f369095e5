//! 预约接口：列表（需凭证 + 归属检查）、创建、状态更新、删除。

mod handlers;
pub(crate) mod validate;

pub(crate) use handlers::{
    create_booking_handler, delete_booking_handler, list_bookings_handler,
    update_booking_status_handler,
};
