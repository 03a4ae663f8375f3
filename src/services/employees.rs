use super::{not_found, ServiceResult};
use crate::db::Tenant;
use crate::domain::aggregates::{Employee, EmployeeInput};

pub async fn list(tenant: &Tenant) -> ServiceResult<Vec<Employee>> {
    let mut employees = tenant.repo::<Employee>().list().await?;
    employees.sort_by(|a, b| b.active.cmp(&a.active).then_with(|| a.name.cmp(&b.name)));
    Ok(employees)
}

pub async fn get(tenant: &Tenant, id: &str) -> ServiceResult<Employee> {
    tenant.repo::<Employee>().get(id).await?.ok_or_else(|| not_found("employee", id))
}

pub async fn create(tenant: &Tenant, input: &EmployeeInput) -> ServiceResult<Employee> {
    let employee = Employee::create(input)?;
    tenant.repo::<Employee>().save(&employee).await?;
    Ok(employee)
}

pub async fn update(tenant: &Tenant, id: &str, input: &EmployeeInput) -> ServiceResult<Employee> {
    let mut employee = get(tenant, id).await?;
    employee.update(input)?;
    tenant.repo::<Employee>().save(&employee).await?;
    Ok(employee)
}

pub async fn delete(tenant: &Tenant, id: &str) -> ServiceResult<()> {
    if !tenant.repo::<Employee>().delete(id).await? {
        return Err(not_found("employee", id));
    }
    Ok(())
}
