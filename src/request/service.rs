use crate::clock;
use crate::error::AppResult;
use crate::ids::{RequestId, UserId};
use crate::pagination::Page;
use crate::request::domain::{NewRequest, RequestView};
use crate::request::repository::DynRequestRepository;

pub struct RequestService {
    requests: DynRequestRepository,
}

impl RequestService {
    pub fn new(requests: DynRequestRepository) -> Self {
        Self { requests }
    }

    pub async fn create(&self, requester: UserId, request: NewRequest) -> AppResult<RequestView> {
        let created = self
            .requests
            .create(requester, &request, clock::now())
            .await?;
        tracing::info!(request_id = %created.id, requester_id = %requester, "Item requested");
        Ok(RequestView::new(created, Vec::new()))
    }

    pub async fn own(&self, requester: UserId, page: Page) -> AppResult<Vec<RequestView>> {
        Ok(self.requests.list_by_requester(requester, page).await?)
    }

    pub async fn others(&self, user: UserId, page: Page) -> AppResult<Vec<RequestView>> {
        Ok(self.requests.list_excluding(user, page).await?)
    }

    pub async fn get(&self, user: UserId, id: RequestId) -> AppResult<RequestView> {
        Ok(self.requests.get(user, id).await?)
    }
}
