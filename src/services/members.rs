//! Member management service

use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::{
        member::{CreateMember, Member, MemberQuery, MemberShort, UpdateMember},
        Page,
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct MembersService {
    repository: Repository,
}

impl MembersService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    pub async fn search_members(&self, query: &MemberQuery) -> AppResult<(Vec<MemberShort>, i64, Page)> {
        let page = Page::new(query.page, query.per_page);
        let (members, total) = self.repository.members.search(query, page).await?;
        Ok((members, total, page))
    }

    pub async fn get_member(&self, id: i32) -> AppResult<Member> {
        self.repository.members.get_by_id(id).await
    }

    pub async fn create_member(&self, member: CreateMember) -> AppResult<Member> {
        member.validate()?;
        let created = self.repository.members.create(&member).await?;
        tracing::info!(member_id = created.id, "Member created");
        Ok(created)
    }

    pub async fn update_member(&self, id: i32, member: UpdateMember) -> AppResult<Member> {
        member.validate()?;
        self.repository.members.update(id, &member).await
    }

    /// Soft delete a member without open loans
    pub async fn delete_member(&self, id: i32) -> AppResult<()> {
        let member = self.repository.members.get_by_id(id).await?;
        let open_loans = self.repository.members.count_open_loans(id).await?;
        if open_loans > 0 {
            return Err(AppError::HasOpenLoans(format!(
                "{} still has {} open loan(s)",
                member.full_name(),
                open_loans
            )));
        }

        self.repository.members.soft_delete(id).await?;
        tracing::info!(member_id = id, "Member deleted");
        Ok(())
    }
}
