//! # Customer Service

use chrono::Utc;
use tracing::info;

use super::{Page, ServiceResult};
use crate::pool::Database;
use crate::repository::{generate_id, CustomerRepository};
use erp_core::validation::{validate_email, validate_name};
use erp_core::{CoreError, Customer, NewCustomer};

pub struct CustomerService<'a> {
    db: &'a Database,
}

impl<'a> CustomerService<'a> {
    pub fn new(db: &'a Database) -> Self {
        CustomerService { db }
    }

    /// Creates a customer. Emails are unique; a duplicate is a conflict.
    pub async fn create(&self, req: NewCustomer) -> ServiceResult<Customer> {
        validate_name("name", &req.name)?;
        validate_email(&req.email)?;

        let now = Utc::now();
        let customer = Customer {
            id: generate_id(),
            name: req.name.trim().to_string(),
            email: req.email.trim().to_lowercase(),
            phone: req.phone,
            address: req.address,
            company_id: req.company_id,
            created_at: now,
            updated_at: now,
        };

        let mut conn = self.db.pool().acquire().await?;
        CustomerRepository::new(&mut conn).insert(&customer).await?;

        info!(id = %customer.id, "Customer created");
        Ok(customer)
    }

    pub async fn get(&self, id: &str) -> ServiceResult<Customer> {
        let mut conn = self.db.pool().acquire().await?;
        CustomerRepository::new(&mut conn)
            .get_by_id(id)
            .await?
            .ok_or_else(|| CoreError::CustomerNotFound(id.to_string()).into())
    }

    pub async fn list(&self, limit: u32, offset: u32) -> ServiceResult<Page<Customer>> {
        let mut conn = self.db.pool().acquire().await?;
        let mut repo = CustomerRepository::new(&mut conn);
        let items = repo.list(limit, offset).await?;
        let total = repo.count().await?;

        Ok(Page {
            items,
            total,
            limit,
            offset,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::tests_support::erp_with_catalog;
    use erp_core::ErrorKind;

    fn new_customer(email: &str) -> NewCustomer {
        NewCustomer {
            name: "Harbor Supply".to_string(),
            email: email.to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_create_get_and_duplicate() {
        let (erp, _) = erp_with_catalog().await;

        let customer = erp
            .customers()
            .create(new_customer("Orders@Harbor.example"))
            .await
            .unwrap();
        assert_eq!(customer.email, "orders@harbor.example");
        assert_eq!(erp.customers().get(&customer.id).await.unwrap().name, "Harbor Supply");

        let err = erp
            .customers()
            .create(new_customer("orders@harbor.example"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::Conflict));

        let err = erp.customers().create(new_customer("not-an-email")).await.unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::Validation));

        // seeded customer plus the new one
        assert_eq!(erp.customers().list(10, 0).await.unwrap().total, 2);
    }
}
