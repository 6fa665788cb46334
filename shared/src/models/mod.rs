//! Data models
//!
//! One module per table group. Entities derive `sqlx::FromRow` behind the
//! `db` feature; create/update payloads are plain serde structs.

pub mod account_setting;
pub mod cart;
pub mod category;
pub mod order;
pub mod password_reset;
pub mod product;
pub mod settlement;
pub mod showcase;
pub mod slug_redirect;
pub mod transaction;
pub mod user;
pub mod vendor_profile;
pub mod wishlist;

pub use account_setting::{AccountSetting, AccountSettingUpdate};
pub use cart::{Cart, CartAddRequest, CartDetail, CartItem, CartItemDetail, CartUpdateRequest};
pub use category::{Category, CategoryCreate, CategoryUpdate};
pub use order::{
    CheckoutRequest, Order, OrderDetail, OrderItem, OrderItemDetail, OrderStatus,
    VendorOrderUpdate,
};
pub use password_reset::PasswordResetToken;
pub use product::{
    ApprovalStatus, BulkAction, BulkActionRequest, Product, ProductCreate, ProductFilter,
    ProductStatus, ProductStatusUpdate, ProductStockUpdate, ProductUpdate, ProductView,
};
pub use settlement::{Settlement, SettlementStatus, SettlementUpdate};
pub use showcase::{
    PlaceholderDetail, PlaceholderPayload, ShowcasePlaceholder, ShowcaseSet, ShowcaseSetCreate,
    ShowcaseSetDetail, ShowcaseSetType, ShowcaseSetUpdate,
};
pub use slug_redirect::{RedirectKind, SlugRedirect};
pub use transaction::{Transaction, TransactionStatus, TransactionUpdate};
pub use user::{Role, User, UserCreate, UserUpdate};
pub use vendor_profile::{
    AdminVendorCreate, AdminVendorUpdate, VendorProfile, VendorProfileCreate, VendorProfileUpdate,
};
pub use wishlist::{Wishlist, WishlistDetail, WishlistItem, WishlistItemDetail};
