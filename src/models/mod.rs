pub mod article;
pub mod lost_found;
pub mod nfc;
pub mod notification;
pub mod pet;
pub mod plan;
pub mod report;
pub mod store;
pub mod subscription;
pub mod user;

pub use article::{slugify, Article, ArticleRecord, ArticleUpdate, NewArticle};
pub use lost_found::{
    Interaction, InteractionKind, InteractionRecord, LostFoundPost, LostFoundPostRecord,
    NewInteraction, NewPost, PostKind, PostStatus, PostUpdate,
};
pub use nfc::{NfcTag, NfcTagRecord, Scan, ScanRecord};
pub use notification::{
    AdminNotificationKind, AdminNotificationRecord, Notification, NotificationDetails,
    NotificationRecord,
};
pub use pet::{MedicalInfo, NewPet, Pet, PetRecord, PetUpdate, PublicPetProfile, Vaccination};
pub use plan::{Plan, Role, PLAN_PET_LIMITS};
pub use report::{Report, ReportRecord};
pub use store::{
    format_cents, price_cart, CartError, CartLine, NewProduct, Order, OrderLine, OrderRecord,
    OrderStatus, Product, ProductRecord, ProductUpdate,
};
pub use subscription::{Subscription, SubscriptionRecord, SubscriptionStatus};
pub use user::{SessionRecord, Theme, User, UserRecord};
