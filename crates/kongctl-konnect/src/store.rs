//! Typed per-kind endpoints and the `RemoteStore` implementation
//!
//! The typed wrappers pin each kind to its path and payload shape; the
//! `RemoteStore` impl dispatches on kind and applies managed/namespace
//! filtering on top. The client itself never injects labels - the executor
//! computes the full label set before handing over the body.

use async_trait::async_trait;
use serde_json::{Map as JsonMap, Value as JsonValue};

use kongctl_core::namespace::NamespaceFilter;
use kongctl_core::resource::ResourceKind;
use kongctl_core::{RemoteResource, RemoteStore, StoreError, StoreResult};

use crate::client::{KonnectClient, OpCtx};
use crate::dto::{
    ApiDocumentDto, ApiDto, ApiImplementationDto, ApiPublicationDto, ApiVersionDto,
    AuthStrategyDto, ControlPlaneDto, PortalDto,
};

impl KonnectClient {
    // ---- portals -----------------------------------------------------------

    pub async fn list_portals(&self) -> StoreResult<Vec<PortalDto>> {
        self.list_pages("v3/portals", &OpCtx::new("list", "portals"))
            .await
    }

    pub async fn create_portal(
        &self,
        body: &JsonMap<String, JsonValue>,
    ) -> StoreResult<PortalDto> {
        self.create_object("v3/portals", body, &OpCtx::new("create", "portal"))
            .await
    }

    pub async fn update_portal(
        &self,
        id: &str,
        body: &JsonMap<String, JsonValue>,
    ) -> StoreResult<PortalDto> {
        self.patch_object(
            &format!("v3/portals/{id}"),
            body,
            &OpCtx::new("update", format!("portal {id}")),
        )
        .await
    }

    pub async fn delete_portal(&self, id: &str, force: bool) -> StoreResult<()> {
        self.delete_object(
            &format!("v3/portals/{id}"),
            force,
            &OpCtx::new("delete", format!("portal {id}")),
        )
        .await
    }

    // ---- apis --------------------------------------------------------------

    pub async fn list_apis(&self) -> StoreResult<Vec<ApiDto>> {
        self.list_pages("v3/apis", &OpCtx::new("list", "apis")).await
    }

    pub async fn create_api(&self, body: &JsonMap<String, JsonValue>) -> StoreResult<ApiDto> {
        self.create_object("v3/apis", body, &OpCtx::new("create", "api"))
            .await
    }

    pub async fn update_api(
        &self,
        id: &str,
        body: &JsonMap<String, JsonValue>,
    ) -> StoreResult<ApiDto> {
        self.patch_object(
            &format!("v3/apis/{id}"),
            body,
            &OpCtx::new("update", format!("api {id}")),
        )
        .await
    }

    pub async fn delete_api(&self, id: &str) -> StoreResult<()> {
        self.delete_object(
            &format!("v3/apis/{id}"),
            false,
            &OpCtx::new("delete", format!("api {id}")),
        )
        .await
    }

    // ---- api versions ------------------------------------------------------

    pub async fn list_api_versions(&self, api_id: &str) -> StoreResult<Vec<ApiVersionDto>> {
        self.list_pages(
            &format!("v3/apis/{api_id}/versions"),
            &OpCtx::new("list", format!("api {api_id} versions")),
        )
        .await
    }

    pub async fn create_api_version(
        &self,
        api_id: &str,
        body: &JsonMap<String, JsonValue>,
    ) -> StoreResult<ApiVersionDto> {
        self.create_object(
            &format!("v3/apis/{api_id}/versions"),
            body,
            &OpCtx::new("create", format!("api {api_id} version")),
        )
        .await
    }

    pub async fn update_api_version(
        &self,
        api_id: &str,
        id: &str,
        body: &JsonMap<String, JsonValue>,
    ) -> StoreResult<ApiVersionDto> {
        self.patch_object(
            &format!("v3/apis/{api_id}/versions/{id}"),
            body,
            &OpCtx::new("update", format!("api {api_id} version {id}")),
        )
        .await
    }

    pub async fn delete_api_version(&self, api_id: &str, id: &str) -> StoreResult<()> {
        self.delete_object(
            &format!("v3/apis/{api_id}/versions/{id}"),
            false,
            &OpCtx::new("delete", format!("api {api_id} version {id}")),
        )
        .await
    }

    // ---- api publications --------------------------------------------------
    //
    // A publication is identified by its (api, portal) pair; both create and
    // update are a PUT against the portal-scoped path.

    pub async fn list_api_publications(
        &self,
        api_id: &str,
    ) -> StoreResult<Vec<ApiPublicationDto>> {
        self.list_pages(
            &format!("v3/apis/{api_id}/publications"),
            &OpCtx::new("list", format!("api {api_id} publications")),
        )
        .await
    }

    pub async fn put_api_publication(
        &self,
        api_id: &str,
        portal_id: &str,
        body: &JsonMap<String, JsonValue>,
    ) -> StoreResult<ApiPublicationDto> {
        self.put_object(
            &format!("v3/apis/{api_id}/publications/{portal_id}"),
            body,
            &OpCtx::new("publish", format!("api {api_id} to portal {portal_id}")),
        )
        .await
    }

    pub async fn delete_api_publication(&self, api_id: &str, portal_id: &str) -> StoreResult<()> {
        self.delete_object(
            &format!("v3/apis/{api_id}/publications/{portal_id}"),
            false,
            &OpCtx::new("unpublish", format!("api {api_id} from portal {portal_id}")),
        )
        .await
    }

    // ---- api implementations -----------------------------------------------

    pub async fn list_api_implementations(
        &self,
        api_id: &str,
    ) -> StoreResult<Vec<ApiImplementationDto>> {
        self.list_pages(
            &format!("v3/apis/{api_id}/implementations"),
            &OpCtx::new("list", format!("api {api_id} implementations")),
        )
        .await
    }

    pub async fn create_api_implementation(
        &self,
        api_id: &str,
        body: &JsonMap<String, JsonValue>,
    ) -> StoreResult<ApiImplementationDto> {
        self.create_object(
            &format!("v3/apis/{api_id}/implementations"),
            body,
            &OpCtx::new("create", format!("api {api_id} implementation")),
        )
        .await
    }

    pub async fn update_api_implementation(
        &self,
        api_id: &str,
        id: &str,
        body: &JsonMap<String, JsonValue>,
    ) -> StoreResult<ApiImplementationDto> {
        self.patch_object(
            &format!("v3/apis/{api_id}/implementations/{id}"),
            body,
            &OpCtx::new("update", format!("api {api_id} implementation {id}")),
        )
        .await
    }

    pub async fn delete_api_implementation(&self, api_id: &str, id: &str) -> StoreResult<()> {
        self.delete_object(
            &format!("v3/apis/{api_id}/implementations/{id}"),
            false,
            &OpCtx::new("delete", format!("api {api_id} implementation {id}")),
        )
        .await
    }

    // ---- api documents -----------------------------------------------------
    //
    // The documents endpoint pages by cursor rather than page number.

    pub async fn list_api_documents(&self, api_id: &str) -> StoreResult<Vec<ApiDocumentDto>> {
        self.list_cursor(
            &format!("v3/apis/{api_id}/documents"),
            &OpCtx::new("list", format!("api {api_id} documents")),
        )
        .await
    }

    pub async fn create_api_document(
        &self,
        api_id: &str,
        body: &JsonMap<String, JsonValue>,
    ) -> StoreResult<ApiDocumentDto> {
        self.create_object(
            &format!("v3/apis/{api_id}/documents"),
            body,
            &OpCtx::new("create", format!("api {api_id} document")),
        )
        .await
    }

    pub async fn update_api_document(
        &self,
        api_id: &str,
        id: &str,
        body: &JsonMap<String, JsonValue>,
    ) -> StoreResult<ApiDocumentDto> {
        self.patch_object(
            &format!("v3/apis/{api_id}/documents/{id}"),
            body,
            &OpCtx::new("update", format!("api {api_id} document {id}")),
        )
        .await
    }

    pub async fn delete_api_document(&self, api_id: &str, id: &str) -> StoreResult<()> {
        self.delete_object(
            &format!("v3/apis/{api_id}/documents/{id}"),
            false,
            &OpCtx::new("delete", format!("api {api_id} document {id}")),
        )
        .await
    }

    // ---- control planes ----------------------------------------------------

    pub async fn list_control_planes(&self) -> StoreResult<Vec<ControlPlaneDto>> {
        self.list_pages("v2/control-planes", &OpCtx::new("list", "control planes"))
            .await
    }

    pub async fn create_control_plane(
        &self,
        body: &JsonMap<String, JsonValue>,
    ) -> StoreResult<ControlPlaneDto> {
        self.create_object(
            "v2/control-planes",
            body,
            &OpCtx::new("create", "control plane"),
        )
        .await
    }

    pub async fn update_control_plane(
        &self,
        id: &str,
        body: &JsonMap<String, JsonValue>,
    ) -> StoreResult<ControlPlaneDto> {
        self.patch_object(
            &format!("v2/control-planes/{id}"),
            body,
            &OpCtx::new("update", format!("control plane {id}")),
        )
        .await
    }

    pub async fn delete_control_plane(&self, id: &str) -> StoreResult<()> {
        self.delete_object(
            &format!("v2/control-planes/{id}"),
            false,
            &OpCtx::new("delete", format!("control plane {id}")),
        )
        .await
    }

    // ---- application auth strategies ---------------------------------------

    pub async fn list_auth_strategies(&self) -> StoreResult<Vec<AuthStrategyDto>> {
        self.list_pages(
            "v2/application-auth-strategies",
            &OpCtx::new("list", "auth strategies"),
        )
        .await
    }

    pub async fn create_auth_strategy(
        &self,
        body: &JsonMap<String, JsonValue>,
    ) -> StoreResult<AuthStrategyDto> {
        self.create_object(
            "v2/application-auth-strategies",
            body,
            &OpCtx::new("create", "auth strategy"),
        )
        .await
    }

    pub async fn update_auth_strategy(
        &self,
        id: &str,
        body: &JsonMap<String, JsonValue>,
    ) -> StoreResult<AuthStrategyDto> {
        self.patch_object(
            &format!("v2/application-auth-strategies/{id}"),
            body,
            &OpCtx::new("update", format!("auth strategy {id}")),
        )
        .await
    }

    pub async fn delete_auth_strategy(&self, id: &str) -> StoreResult<()> {
        self.delete_object(
            &format!("v2/application-auth-strategies/{id}"),
            false,
            &OpCtx::new("delete", format!("auth strategy {id}")),
        )
        .await
    }

    /// List every remote resource of a kind, unfiltered.
    async fn list_raw(
        &self,
        kind: ResourceKind,
        parent: Option<&str>,
    ) -> StoreResult<Vec<RemoteResource>> {
        fn converted<D: Into<RemoteResource>>(dtos: Vec<D>) -> Vec<RemoteResource> {
            dtos.into_iter().map(Into::into).collect()
        }

        let resources = match kind {
            ResourceKind::Portal => converted(self.list_portals().await?),
            ResourceKind::Api => converted(self.list_apis().await?),
            ResourceKind::ControlPlane => converted(self.list_control_planes().await?),
            ResourceKind::ApplicationAuthStrategy => converted(self.list_auth_strategies().await?),
            ResourceKind::ApiVersion => {
                converted(self.list_api_versions(require_parent(kind, parent)?).await?)
            }
            ResourceKind::ApiPublication => converted(
                self.list_api_publications(require_parent(kind, parent)?)
                    .await?,
            ),
            ResourceKind::ApiImplementation => converted(
                self.list_api_implementations(require_parent(kind, parent)?)
                    .await?,
            ),
            ResourceKind::ApiDocument => {
                converted(self.list_api_documents(require_parent(kind, parent)?).await?)
            }
        };

        let parent_id = parent.map(String::from);
        Ok(resources
            .into_iter()
            .map(|mut r| {
                r.parent_id = parent_id.clone();
                r
            })
            .collect())
    }
}

fn require_parent<'a>(kind: ResourceKind, parent: Option<&'a str>) -> StoreResult<&'a str> {
    parent.ok_or_else(|| StoreError::InvalidRequest {
        operation: "list".to_string(),
        message: format!("{kind} operations require a parent api id"),
    })
}

#[async_trait]
impl RemoteStore for KonnectClient {
    async fn list_managed(
        &self,
        kind: ResourceKind,
        parent: Option<&str>,
        namespaces: &NamespaceFilter,
    ) -> StoreResult<Vec<RemoteResource>> {
        let resources = self.list_raw(kind, parent).await?;
        Ok(resources
            .into_iter()
            .filter(|r| {
                r.is_managed() && r.namespace().is_some_and(|ns| namespaces.matches(ns))
            })
            .collect())
    }

    async fn find_adoptable(
        &self,
        kind: ResourceKind,
        parent: Option<&str>,
        name: &str,
    ) -> StoreResult<Option<RemoteResource>> {
        let resources = self.list_raw(kind, parent).await?;
        Ok(resources
            .into_iter()
            .find(|r| r.name == name && r.is_legacy_managed()))
    }

    async fn create(
        &self,
        kind: ResourceKind,
        parent: Option<&str>,
        body: &JsonMap<String, JsonValue>,
    ) -> StoreResult<RemoteResource> {
        match kind {
            ResourceKind::Portal => Ok(self.create_portal(body).await?.into()),
            ResourceKind::Api => Ok(self.create_api(body).await?.into()),
            ResourceKind::ControlPlane => Ok(self.create_control_plane(body).await?.into()),
            ResourceKind::ApplicationAuthStrategy => {
                Ok(self.create_auth_strategy(body).await?.into())
            }
            ResourceKind::ApiVersion => Ok(self
                .create_api_version(require_parent(kind, parent)?, body)
                .await?
                .into()),
            ResourceKind::ApiPublication => {
                let api_id = require_parent(kind, parent)?;
                let (portal_id, body) = split_portal_id(body)?;
                Ok(self.put_api_publication(api_id, &portal_id, &body).await?.into())
            }
            ResourceKind::ApiImplementation => Ok(self
                .create_api_implementation(require_parent(kind, parent)?, body)
                .await?
                .into()),
            ResourceKind::ApiDocument => Ok(self
                .create_api_document(require_parent(kind, parent)?, body)
                .await?
                .into()),
        }
    }

    async fn update(
        &self,
        kind: ResourceKind,
        parent: Option<&str>,
        id: &str,
        body: &JsonMap<String, JsonValue>,
    ) -> StoreResult<RemoteResource> {
        match kind {
            ResourceKind::Portal => Ok(self.update_portal(id, body).await?.into()),
            ResourceKind::Api => Ok(self.update_api(id, body).await?.into()),
            ResourceKind::ControlPlane => Ok(self.update_control_plane(id, body).await?.into()),
            ResourceKind::ApplicationAuthStrategy => {
                Ok(self.update_auth_strategy(id, body).await?.into())
            }
            ResourceKind::ApiVersion => Ok(self
                .update_api_version(require_parent(kind, parent)?, id, body)
                .await?
                .into()),
            ResourceKind::ApiPublication => {
                // Updates re-PUT the portal-scoped path; the id is the portal.
                let api_id = require_parent(kind, parent)?;
                let mut body = body.clone();
                body.remove("portal_id");
                Ok(self.put_api_publication(api_id, id, &body).await?.into())
            }
            ResourceKind::ApiImplementation => Ok(self
                .update_api_implementation(require_parent(kind, parent)?, id, body)
                .await?
                .into()),
            ResourceKind::ApiDocument => Ok(self
                .update_api_document(require_parent(kind, parent)?, id, body)
                .await?
                .into()),
        }
    }

    async fn delete(
        &self,
        kind: ResourceKind,
        parent: Option<&str>,
        id: &str,
    ) -> StoreResult<()> {
        match kind {
            ResourceKind::Portal => self.delete_portal(id, true).await,
            ResourceKind::Api => self.delete_api(id).await,
            ResourceKind::ControlPlane => self.delete_control_plane(id).await,
            ResourceKind::ApplicationAuthStrategy => self.delete_auth_strategy(id).await,
            ResourceKind::ApiVersion => {
                self.delete_api_version(require_parent(kind, parent)?, id).await
            }
            ResourceKind::ApiPublication => {
                self.delete_api_publication(require_parent(kind, parent)?, id)
                    .await
            }
            ResourceKind::ApiImplementation => {
                self.delete_api_implementation(require_parent(kind, parent)?, id)
                    .await
            }
            ResourceKind::ApiDocument => {
                self.delete_api_document(require_parent(kind, parent)?, id)
                    .await
            }
        }
    }
}

/// Pull the portal id out of a publication body; it routes the request
/// rather than travelling in the payload.
fn split_portal_id(
    body: &JsonMap<String, JsonValue>,
) -> StoreResult<(String, JsonMap<String, JsonValue>)> {
    let mut body = body.clone();
    let portal_id = body
        .remove("portal_id")
        .and_then(|v| v.as_str().map(String::from))
        .ok_or_else(|| StoreError::InvalidRequest {
            operation: "publish".to_string(),
            message: "publication body missing portal_id".to_string(),
        })?;
    Ok((portal_id, body))
}
