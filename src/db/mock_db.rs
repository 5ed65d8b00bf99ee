use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use super::{
    book_repository::BookRepository, member_repository::MemberRepository,
    plan_repository::PlanRepository, subscription_repository::SubscriptionRepository,
    user_repository::UserRepository,
};
use crate::models::{
    book::{Book, BookChanges},
    member::{Member, MemberChanges, MemberKind, NewMember},
    subscription::{
        NewInstance, NewPlan, PaymentStatus, PlanChanges, StatusUpdate, SubscriptionInstance,
        SubscriptionPlan, SubscriptionStatus,
    },
    user::{NewUser, User},
};

/// In-memory store backing every repository trait. `should_fail` turns every
/// call into a database error.
#[derive(Default)]
pub struct MockDb {
    pub should_fail: bool,
    pub users: Mutex<HashMap<Uuid, User>>,
    pub plans: Mutex<HashMap<Uuid, SubscriptionPlan>>,
    pub instances: Mutex<HashMap<Uuid, SubscriptionInstance>>,
    pub books: Mutex<HashMap<Uuid, Book>>,
    pub members: Mutex<HashMap<(&'static str, Uuid), Member>>,
    pub fail_member_insert: bool,
}

impl MockDb {
    fn check(&self) -> Result<(), sqlx::Error> {
        if self.should_fail {
            return Err(sqlx::Error::Protocol("Mock DB failure".into()));
        }
        Ok(())
    }

    pub fn seed_user(&self, user: User) {
        self.users.lock().unwrap().insert(user.id, user);
    }

    pub fn seed_plan(&self, plan: SubscriptionPlan) {
        self.plans.lock().unwrap().insert(plan.id, plan);
    }

    pub fn seed_instance(&self, instance: SubscriptionInstance) {
        self.instances.lock().unwrap().insert(instance.id, instance);
    }

    pub fn user(&self, id: Uuid) -> Option<User> {
        self.users.lock().unwrap().get(&id).cloned()
    }

    pub fn plan(&self, id: Uuid) -> Option<SubscriptionPlan> {
        self.plans.lock().unwrap().get(&id).cloned()
    }

    pub fn instance(&self, id: Uuid) -> Option<SubscriptionInstance> {
        self.instances.lock().unwrap().get(&id).cloned()
    }

    pub fn all_instances(&self) -> Vec<SubscriptionInstance> {
        let mut all: Vec<_> = self.instances.lock().unwrap().values().cloned().collect();
        all.sort_by_key(|i| i.id);
        all
    }
}

#[async_trait]
impl UserRepository for MockDb {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, sqlx::Error> {
        self.check()?;
        Ok(self
            .users
            .lock()
            .unwrap()
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn find_user_by_id(&self, user_id: Uuid) -> Result<Option<User>, sqlx::Error> {
        self.check()?;
        Ok(self.user(user_id))
    }

    async fn create_user(&self, new_user: NewUser) -> Result<User, sqlx::Error> {
        self.check()?;
        let now = OffsetDateTime::now_utc();
        let user = User {
            id: Uuid::new_v4(),
            name: new_user.name,
            email: new_user.email,
            password_hash: new_user.password_hash,
            token: None,
            is_superuser: new_user.is_superuser,
            role: new_user.role,
            stripe_customer_id: None,
            created_at: now,
            updated_at: now,
        };
        self.seed_user(user.clone());
        Ok(user)
    }

    async fn delete_user(&self, user_id: Uuid) -> Result<bool, sqlx::Error> {
        self.check()?;
        Ok(self.users.lock().unwrap().remove(&user_id).is_some())
    }

    async fn set_token(&self, user_id: Uuid, token: Option<&str>) -> Result<(), sqlx::Error> {
        self.check()?;
        if let Some(user) = self.users.lock().unwrap().get_mut(&user_id) {
            user.token = token.map(str::to_string);
        }
        Ok(())
    }

    async fn set_stripe_customer_id(
        &self,
        user_id: Uuid,
        customer_id: &str,
    ) -> Result<(), sqlx::Error> {
        self.check()?;
        if let Some(user) = self.users.lock().unwrap().get_mut(&user_id) {
            user.stripe_customer_id = Some(customer_id.to_string());
        }
        Ok(())
    }
}

#[async_trait]
impl PlanRepository for MockDb {
    async fn insert_plan(&self, plan: NewPlan) -> Result<SubscriptionPlan, sqlx::Error> {
        self.check()?;
        let now = OffsetDateTime::now_utc();
        let plan = SubscriptionPlan {
            id: Uuid::new_v4(),
            title: plan.title,
            description: plan.description,
            recurrence: plan.recurrence,
            price: plan.price,
            product_id: plan.product_id,
            price_id: plan.price_id,
            created_at: now,
            updated_at: now,
        };
        self.seed_plan(plan.clone());
        Ok(plan)
    }

    async fn find_plan_by_id(
        &self,
        plan_id: Uuid,
    ) -> Result<Option<SubscriptionPlan>, sqlx::Error> {
        self.check()?;
        Ok(self.plan(plan_id))
    }

    async fn list_plans(&self) -> Result<Vec<SubscriptionPlan>, sqlx::Error> {
        self.check()?;
        let mut plans: Vec<_> = self.plans.lock().unwrap().values().cloned().collect();
        plans.sort_by_key(|p| p.created_at);
        Ok(plans)
    }

    async fn update_plan(
        &self,
        plan_id: Uuid,
        changes: &PlanChanges,
    ) -> Result<Option<SubscriptionPlan>, sqlx::Error> {
        self.check()?;
        let mut plans = self.plans.lock().unwrap();
        let Some(plan) = plans.get_mut(&plan_id) else {
            return Ok(None);
        };
        if let Some(title) = &changes.title {
            plan.title = title.clone();
        }
        if let Some(description) = &changes.description {
            plan.description = description.clone();
        }
        if let Some(recurrence) = changes.recurrence {
            plan.recurrence = recurrence;
        }
        if let Some(price) = changes.price {
            plan.price = price;
        }
        if let Some(price_id) = &changes.price_id {
            plan.price_id = price_id.clone();
        }
        plan.updated_at = OffsetDateTime::now_utc();
        Ok(Some(plan.clone()))
    }

    async fn delete_plan(&self, plan_id: Uuid) -> Result<bool, sqlx::Error> {
        self.check()?;
        Ok(self.plans.lock().unwrap().remove(&plan_id).is_some())
    }
}

#[async_trait]
impl SubscriptionRepository for MockDb {
    async fn insert_instance(
        &self,
        instance: NewInstance,
    ) -> Result<SubscriptionInstance, sqlx::Error> {
        self.check()?;
        let now = OffsetDateTime::now_utc();
        let instance = SubscriptionInstance {
            id: Uuid::new_v4(),
            system_user_id: instance.system_user_id,
            plan_id: instance.plan_id,
            customer_id: None,
            price_id: instance.price_id,
            stripe_sub_id: None,
            payment_link: None,
            payment_status: PaymentStatus::Open,
            status: SubscriptionStatus::Pending,
            created_at: now,
            updated_at: now,
        };
        self.seed_instance(instance.clone());
        Ok(instance)
    }

    async fn find_instance_by_id(
        &self,
        instance_id: Uuid,
    ) -> Result<Option<SubscriptionInstance>, sqlx::Error> {
        self.check()?;
        Ok(self.instance(instance_id))
    }

    async fn find_instance_by_stripe_sub_id(
        &self,
        stripe_sub_id: &str,
    ) -> Result<Option<SubscriptionInstance>, sqlx::Error> {
        self.check()?;
        Ok(self
            .instances
            .lock()
            .unwrap()
            .values()
            .filter(|i| i.stripe_sub_id.as_deref() == Some(stripe_sub_id))
            .max_by_key(|i| i.created_at)
            .cloned())
    }

    async fn attach_checkout(
        &self,
        instance_id: Uuid,
        customer_id: &str,
        payment_link: &str,
    ) -> Result<Option<SubscriptionInstance>, sqlx::Error> {
        self.check()?;
        let mut instances = self.instances.lock().unwrap();
        let Some(instance) = instances.get_mut(&instance_id) else {
            return Ok(None);
        };
        instance.customer_id = Some(customer_id.to_string());
        instance.payment_link = Some(payment_link.to_string());
        instance.updated_at = OffsetDateTime::now_utc();
        Ok(Some(instance.clone()))
    }

    async fn apply_transition(
        &self,
        instance_id: Uuid,
        expected: &[SubscriptionStatus],
        update: &StatusUpdate,
    ) -> Result<Option<SubscriptionInstance>, sqlx::Error> {
        self.check()?;
        let mut instances = self.instances.lock().unwrap();
        let Some(instance) = instances.get_mut(&instance_id) else {
            return Ok(None);
        };
        if !expected.contains(&instance.status) {
            return Ok(None);
        }
        instance.payment_status = update.payment_status;
        instance.status = update.status;
        if let Some(sub_id) = &update.stripe_sub_id {
            instance.stripe_sub_id = Some(sub_id.clone());
        }
        instance.updated_at = OffsetDateTime::now_utc();
        Ok(Some(instance.clone()))
    }
}

#[async_trait]
impl BookRepository for MockDb {
    async fn insert_book(&self, book: BookChanges) -> Result<Book, sqlx::Error> {
        self.check()?;
        let now = OffsetDateTime::now_utc();
        let book = Book {
            id: Uuid::new_v4(),
            title: book.title.unwrap_or_default(),
            author: book.author.unwrap_or_default(),
            publisher: book.publisher.unwrap_or_default(),
            publish_date: book.publish_date.unwrap_or_default(),
            isbn: book.isbn.unwrap_or_default(),
            cover_image: book.cover_image,
            book_pdf: book.book_pdf,
            tags: book.tags.unwrap_or_default(),
            created_at: now,
            updated_at: now,
        };
        self.books.lock().unwrap().insert(book.id, book.clone());
        Ok(book)
    }

    async fn find_book_by_id(&self, book_id: Uuid) -> Result<Option<Book>, sqlx::Error> {
        self.check()?;
        Ok(self.books.lock().unwrap().get(&book_id).cloned())
    }

    async fn list_books(&self) -> Result<Vec<Book>, sqlx::Error> {
        self.check()?;
        let mut books: Vec<_> = self.books.lock().unwrap().values().cloned().collect();
        books.sort_by_key(|b| b.created_at);
        Ok(books)
    }

    async fn update_book(
        &self,
        book_id: Uuid,
        changes: &BookChanges,
    ) -> Result<Option<Book>, sqlx::Error> {
        self.check()?;
        let mut books = self.books.lock().unwrap();
        let Some(book) = books.get_mut(&book_id) else {
            return Ok(None);
        };
        let set = |target: &mut String, value: &Option<String>| {
            if let Some(v) = value {
                *target = v.clone();
            }
        };
        set(&mut book.title, &changes.title);
        set(&mut book.author, &changes.author);
        set(&mut book.publisher, &changes.publisher);
        set(&mut book.publish_date, &changes.publish_date);
        set(&mut book.isbn, &changes.isbn);
        if let Some(tags) = &changes.tags {
            book.tags = tags.clone();
        }
        if changes.cover_image.is_some() {
            book.cover_image = changes.cover_image.clone();
        }
        if changes.book_pdf.is_some() {
            book.book_pdf = changes.book_pdf.clone();
        }
        book.updated_at = OffsetDateTime::now_utc();
        Ok(Some(book.clone()))
    }

    async fn delete_book(&self, book_id: Uuid) -> Result<Option<Book>, sqlx::Error> {
        self.check()?;
        Ok(self.books.lock().unwrap().remove(&book_id))
    }
}

#[async_trait]
impl MemberRepository for MockDb {
    async fn insert_member(
        &self,
        kind: MemberKind,
        member: NewMember,
    ) -> Result<Member, sqlx::Error> {
        self.check()?;
        if self.fail_member_insert {
            return Err(sqlx::Error::Protocol("Mock member insert failure".into()));
        }
        let now = OffsetDateTime::now_utc();
        let member = Member {
            id: Uuid::new_v4(),
            system_user_id: member.system_user_id,
            first_name: member.first_name,
            last_name: member.last_name,
            email: member.email,
            member_code: member.member_code,
            created_at: now,
            updated_at: now,
        };
        self.members
            .lock()
            .unwrap()
            .insert((kind.table(), member.id), member.clone());
        Ok(member)
    }

    async fn list_members(&self, kind: MemberKind) -> Result<Vec<Member>, sqlx::Error> {
        self.check()?;
        let mut members: Vec<_> = self
            .members
            .lock()
            .unwrap()
            .iter()
            .filter(|((table, _), _)| *table == kind.table())
            .map(|(_, m)| m.clone())
            .collect();
        members.sort_by_key(|m| m.created_at);
        Ok(members)
    }

    async fn find_member_by_id(
        &self,
        kind: MemberKind,
        member_id: Uuid,
    ) -> Result<Option<Member>, sqlx::Error> {
        self.check()?;
        Ok(self
            .members
            .lock()
            .unwrap()
            .get(&(kind.table(), member_id))
            .cloned())
    }

    async fn update_member(
        &self,
        kind: MemberKind,
        member_id: Uuid,
        changes: &MemberChanges,
    ) -> Result<Option<Member>, sqlx::Error> {
        self.check()?;
        let mut members = self.members.lock().unwrap();
        let Some(member) = members.get_mut(&(kind.table(), member_id)) else {
            return Ok(None);
        };
        if let Some(v) = &changes.first_name {
            member.first_name = v.clone();
        }
        if let Some(v) = &changes.last_name {
            member.last_name = v.clone();
        }
        if let Some(v) = &changes.email {
            member.email = v.clone();
        }
        if let Some(v) = &changes.member_code {
            member.member_code = v.clone();
        }
        member.updated_at = OffsetDateTime::now_utc();
        Ok(Some(member.clone()))
    }

    async fn delete_member(&self, kind: MemberKind, member_id: Uuid) -> Result<bool, sqlx::Error> {
        self.check()?;
        Ok(self
            .members
            .lock()
            .unwrap()
            .remove(&(kind.table(), member_id))
            .is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pending_instance() -> NewInstance {
        NewInstance {
            system_user_id: Uuid::new_v4(),
            plan_id: Uuid::new_v4(),
            price_id: "price_1".into(),
        }
    }

    #[tokio::test]
    async fn guarded_transition_only_applies_from_expected_status() {
        let db = MockDb::default();
        let inst = db.insert_instance(pending_instance()).await.unwrap();
        let update = StatusUpdate {
            payment_status: PaymentStatus::Paid,
            status: SubscriptionStatus::Subscribed,
            stripe_sub_id: Some("sub_1".into()),
        };

        let first = db
            .apply_transition(inst.id, &[SubscriptionStatus::Pending], &update)
            .await
            .unwrap();
        assert!(first.is_some());

        let second = db
            .apply_transition(inst.id, &[SubscriptionStatus::Pending], &update)
            .await
            .unwrap();
        assert!(second.is_none());
    }

    #[tokio::test]
    async fn should_fail_surfaces_database_error() {
        let db = MockDb {
            should_fail: true,
            ..Default::default()
        };
        assert!(db.list_plans().await.is_err());
        assert!(db.find_user_by_email("a@b.c").await.is_err());
    }
}
