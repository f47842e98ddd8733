pub mod audit_logs;
pub mod balance_withdrawals;
pub mod order_deliveries;
pub mod order_items;
pub mod order_tracking;
pub mod orders;
pub mod products;
pub mod seller_balances;
pub mod users;

pub use audit_logs::Entity as AuditLogs;
pub use balance_withdrawals::Entity as BalanceWithdrawals;
pub use order_deliveries::Entity as OrderDeliveries;
pub use order_items::Entity as OrderItems;
pub use order_tracking::Entity as OrderTracking;
pub use orders::Entity as Orders;
pub use products::Entity as Products;
pub use seller_balances::Entity as SellerBalances;
pub use users::Entity as Users;
