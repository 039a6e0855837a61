use redb::TableDefinition;

/// Users table: user_id -> UserRecord (serialized)
pub const USERS: TableDefinition<&str, &[u8]> = TableDefinition::new("users");

/// E-mail index: lower-cased email -> user_id (serialized)
pub const USER_EMAILS: TableDefinition<&str, &[u8]> = TableDefinition::new("user_emails");

/// Sessions table: SHA-256 of the bearer token -> SessionRecord (serialized)
pub const SESSIONS: TableDefinition<&str, &[u8]> = TableDefinition::new("sessions");

/// Pets table: pet_id -> PetRecord (serialized)
pub const PETS: TableDefinition<&str, &[u8]> = TableDefinition::new("pets");

/// Owner pets index: owner_id -> Vec<pet_id>
/// Its length is the quota denominator
pub const OWNER_PETS: TableDefinition<&str, &[u8]> = TableDefinition::new("owner_pets");

/// Subscriptions table: subscription_id -> SubscriptionRecord (serialized)
pub const SUBSCRIPTIONS: TableDefinition<&str, &[u8]> = TableDefinition::new("subscriptions");

/// Reports table: report_id -> ReportRecord (serialized)
pub const REPORTS: TableDefinition<&str, &[u8]> = TableDefinition::new("reports");

/// NFC tags table: tag_code -> NfcTagRecord (serialized)
pub const NFC_TAGS: TableDefinition<&str, &[u8]> = TableDefinition::new("nfc_tags");

/// NFC scans table: scan_id -> ScanRecord (serialized)
pub const NFC_SCANS: TableDefinition<&str, &[u8]> = TableDefinition::new("nfc_scans");

/// Notifications table: notification_id -> NotificationRecord (serialized)
pub const NOTIFICATIONS: TableDefinition<&str, &[u8]> = TableDefinition::new("notifications");

/// Admin notifications table: notification_id -> AdminNotificationRecord (serialized)
pub const ADMIN_NOTIFICATIONS: TableDefinition<&str, &[u8]> =
    TableDefinition::new("admin_notifications");

/// Lost & found posts table: post_id -> LostFoundPostRecord (serialized)
pub const LOST_FOUND_POSTS: TableDefinition<&str, &[u8]> = TableDefinition::new("lost_found_posts");

/// Lost & found interactions table: interaction_id -> InteractionRecord (serialized)
pub const LOST_FOUND_INTERACTIONS: TableDefinition<&str, &[u8]> =
    TableDefinition::new("lost_found_interactions");

/// Articles table: article_id -> ArticleRecord (serialized)
pub const ARTICLES: TableDefinition<&str, &[u8]> = TableDefinition::new("articles");

/// Store products table: product_id -> ProductRecord (serialized)
pub const STORE_PRODUCTS: TableDefinition<&str, &[u8]> = TableDefinition::new("store_products");

/// Store orders table: order_id -> OrderRecord (serialized)
pub const STORE_ORDERS: TableDefinition<&str, &[u8]> = TableDefinition::new("store_orders");

/// Every table, for creation on first run
pub const ALL: [TableDefinition<&str, &[u8]>; 16] = [
    USERS,
    USER_EMAILS,
    SESSIONS,
    PETS,
    OWNER_PETS,
    SUBSCRIPTIONS,
    REPORTS,
    NFC_TAGS,
    NFC_SCANS,
    NOTIFICATIONS,
    ADMIN_NOTIFICATIONS,
    LOST_FOUND_POSTS,
    LOST_FOUND_INTERACTIONS,
    ARTICLES,
    STORE_PRODUCTS,
    STORE_ORDERS,
];
