use common::plans::{CURRENCY, Plan, PlanCatalog};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct PlanListItem {
    pub id: String,
    pub title: String,
    pub description: String,
    pub price: i64,
    pub currency: &'static str,
    pub days: u32,
    /// Value to put in the invoice so the payment can be matched back to the plan.
    pub invoice_payload: String,
}

impl PlanListItem {
    pub fn from_catalog(catalog: &PlanCatalog) -> Vec<Self> {
        catalog
            .purchasable()
            .into_iter()
            .filter_map(|plan| {
                let payload = catalog.invoice_payload(&plan.id)?;
                Some(Self::new(plan, payload.to_string()))
            })
            .collect()
    }

    fn new(plan: &Plan, invoice_payload: String) -> Self {
        PlanListItem {
            id: plan.id.clone(),
            title: plan.title.clone(),
            description: plan.description.clone(),
            price: plan.price,
            currency: CURRENCY,
            days: plan.days,
            invoice_payload,
        }
    }
}
