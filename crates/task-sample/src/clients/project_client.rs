//! # Project Client
//!
//! Provides a high-level API for the `projects` resource.
use crate::error::ProjectError;
use crate::model::{Person, Project, ProjectId};
use resource_bridge::{BridgeError, Relation, RepositoryStub, ResourceRepository, TypedClient};
use tracing::{debug, instrument};

/// Client for the remote project repository.
///
/// Holds a people stub as well, to resolve owners the server sent as bare references.
#[derive(Debug, Clone)]
pub struct ProjectClient {
    inner: RepositoryStub<Project>,
    people: RepositoryStub<Person>,
}

impl ProjectClient {
    pub fn new(inner: RepositoryStub<Project>, people: RepositoryStub<Person>) -> Self {
        Self { inner, people }
    }
}

impl TypedClient<Project> for ProjectClient {
    type Error = ProjectError;

    fn inner(&self) -> &RepositoryStub<Project> {
        &self.inner
    }

    fn map_error(e: BridgeError) -> Self::Error {
        match e {
            BridgeError::NotFound { id, .. } => ProjectError::NotFound(id),
            other => ProjectError::ServiceError(other.to_string()),
        }
    }
}

impl ProjectClient {
    #[instrument(skip(self))]
    pub fn create_project(&self, project: Project) -> Result<ProjectId, ProjectError> {
        debug!("Sending request");
        let created = self.inner.create(project).map_err(Self::map_error)?;
        created
            .id
            .ok_or_else(|| ProjectError::ServiceError("server assigned no id".into()))
    }

    /// The owner of a project. The server embeds owners in project responses; only an owner
    /// it could not embed costs a second request.
    #[instrument(skip(self))]
    pub fn owner(&self, id: ProjectId) -> Result<Person, ProjectError> {
        let project = self
            .get(id.clone())?
            .ok_or_else(|| ProjectError::NotFound(id.to_string()))?;
        match project.owner {
            Some(Relation::Loaded(owner)) => Ok(owner),
            Some(Relation::Reference(reference)) => {
                debug!(owner_id = reference.id, "Resolving owner reference");
                self.people
                    .find_one(&reference.id, None)
                    .map_err(Self::map_error)
            }
            None => Err(ProjectError::NoOwner(id.to_string())),
        }
    }
}
