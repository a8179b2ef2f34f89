//! Per-category rows of a budget.

use sea_orm::{ActiveValue, entity::prelude::*};
use uuid::Uuid;

use crate::CategoryAllocation;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "budget_allocations")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub budget_id: Uuid,
    #[sea_orm(primary_key, auto_increment = false)]
    pub category_id: Uuid,
    pub allocated_limit: i64,
    pub included: bool,
    pub computed_spent: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::budgets::Entity",
        from = "Column::BudgetId",
        to = "super::budgets::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Budget,
}

impl Related<super::budgets::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Budget.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl ActiveModel {
    pub(crate) fn from_allocation(budget_id: Uuid, allocation: &CategoryAllocation) -> Self {
        Self {
            budget_id: ActiveValue::Set(budget_id),
            category_id: ActiveValue::Set(allocation.category_id),
            allocated_limit: ActiveValue::Set(allocation.allocated_limit),
            included: ActiveValue::Set(allocation.included),
            computed_spent: ActiveValue::Set(allocation.computed_spent),
        }
    }
}
