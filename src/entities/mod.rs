pub mod activity_log;
pub mod asset;
pub mod category;
pub mod procurement_activity_log;
pub mod procurement_asset;
pub mod procurement_item;
pub mod procurement_order;
pub mod project;
pub mod project_assignment;

pub use asset::AssetWorkflowStatus;
pub use procurement_item::ItemDiscrepancyStatus;
pub use procurement_order::{
    DeliveryMethod, DeliveryStatus, DiscrepancyType, OrderStatus, ResolutionAction,
};
