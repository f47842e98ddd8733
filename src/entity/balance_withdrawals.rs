use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "balance_withdrawals")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: Uuid,
    pub seller_id: Uuid,
    pub amount: i64,
    pub status: String,
    pub processed_at: Option<DateTimeWithTimeZone>,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::seller_balances::Entity",
        from = "Column::SellerId",
        to = "super::seller_balances::Column::SellerId"
    )]
    SellerBalance,
}

impl Related<super::seller_balances::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SellerBalance.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
