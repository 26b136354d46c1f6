//! Authorization decisions.
//!
//! `decide` is a pure function of the actor and the operation (which carries whatever
//! facts about the target the rule needs). Services load those facts, ask for a
//! decision, and only touch storage on `Allow`. Every denial names a specific reason
//! so callers can show a precise message instead of a bare 403.

use bson::oid::ObjectId;
use tracing::warn;

use crate::model::user::Role;
use crate::util::error::ServiceError;

/// The authenticated identity performing an operation, resolved once per request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub id: ObjectId,
    pub role: Role,
}

impl Actor {
    pub fn new(id: ObjectId, role: Role) -> Self {
        Actor { id, role }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    /// Admin-created account. Self-registration needs no actor and never reaches the policy.
    CreateAccount { role: Role },
    /// List, inspect, or reset the password of accounts.
    ManageUsers,
    DeleteUser { target_id: ObjectId, target_role: Role },
    ChangeRole { target_id: ObjectId, target_role: Role, new_role: Role },
    CreatePoll,
    /// Update, reschedule, delete, reset votes, or edit options of a poll.
    ModifyPoll { owner: ObjectId },
    ViewAllPolls,
    ViewOwnPolls,
    ViewPoll { owner: ObjectId, votable: bool },
    ViewResults { owner: ObjectId },
    ListVotablePolls,
    /// Role gate for voting, checked before the target poll is loaded.
    CastVote,
    SubmitVote { votable: bool, option_in_poll: bool, already_voted: bool },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    AdminOnly,
    InvalidAccountRole,
    CannotDeleteSelf,
    CannotDeleteAdmin,
    InvalidRoleTarget,
    CannotChangeOwnRole,
    CannotChangeAdminRole,
    FacultyOnlyCreate,
    NotPollOwner,
    FacultyOnlyOwnPolls,
    StudentResultsRestricted,
    StudentsOnly,
    PollNotOpen,
    OptionNotInPoll,
    AlreadyVoted,
}

impl DenyReason {
    pub fn message(&self) -> &'static str {
        match self {
            DenyReason::AdminOnly => "Insufficient privilege: admin role required",
            DenyReason::InvalidAccountRole => "Admins can only create faculty or admin accounts",
            DenyReason::CannotDeleteSelf => "Cannot delete own account",
            DenyReason::CannotDeleteAdmin => "Cannot delete admin accounts",
            DenyReason::InvalidRoleTarget => "Role can only be changed to faculty or student",
            DenyReason::CannotChangeOwnRole => "Cannot change your own role",
            DenyReason::CannotChangeAdminRole => "Cannot change admin user roles",
            DenyReason::FacultyOnlyCreate => "Only faculty can create polls",
            DenyReason::NotPollOwner => "Not owner: you can only manage your own polls",
            DenyReason::FacultyOnlyOwnPolls => "Only faculty can view their own polls",
            DenyReason::StudentResultsRestricted => "Students cannot view poll results directly",
            DenyReason::StudentsOnly => "Only students can vote",
            DenyReason::PollNotOpen => "This poll is not open",
            DenyReason::OptionNotInPoll => "Invalid option selected",
            DenyReason::AlreadyVoted => "You have already voted on this poll",
        }
    }
}

impl std::fmt::Display for DenyReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.message())
    }
}

impl From<DenyReason> for ServiceError {
    fn from(reason: DenyReason) -> Self {
        let message = reason.message().to_string();
        match reason {
            DenyReason::PollNotOpen | DenyReason::AlreadyVoted => ServiceError::Conflict(message),
            DenyReason::OptionNotInPoll => ServiceError::NotFound(message),
            DenyReason::InvalidRoleTarget | DenyReason::InvalidAccountRole => ServiceError::InvalidInput(message),
            _ => ServiceError::Forbidden(message),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(DenyReason),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }

    pub fn into_result(self) -> Result<(), ServiceError> {
        match self {
            Decision::Allow => Ok(()),
            Decision::Deny(reason) => Err(reason.into()),
        }
    }
}

fn require(condition: bool, reason: DenyReason) -> Result<(), DenyReason> {
    if condition { Ok(()) } else { Err(reason) }
}

/// Rules are checked in order; the first failing rule is the reported reason.
pub fn decide(actor: &Actor, op: &Operation) -> Decision {
    let is_admin = actor.role == Role::Admin;
    let is_faculty = actor.role == Role::Faculty;

    let outcome = match op {
        Operation::CreateAccount { role } => require(is_admin, DenyReason::AdminOnly)
            .and_then(|_| require(matches!(role, Role::Faculty | Role::Admin), DenyReason::InvalidAccountRole)),

        Operation::ManageUsers | Operation::ViewAllPolls => require(is_admin, DenyReason::AdminOnly),

        Operation::DeleteUser { target_id, target_role } => require(is_admin, DenyReason::AdminOnly)
            .and_then(|_| require(*target_id != actor.id, DenyReason::CannotDeleteSelf))
            .and_then(|_| require(*target_role != Role::Admin, DenyReason::CannotDeleteAdmin)),

        Operation::ChangeRole { target_id, target_role, new_role } => require(is_admin, DenyReason::AdminOnly)
            .and_then(|_| require(*new_role != Role::Admin, DenyReason::InvalidRoleTarget))
            .and_then(|_| require(*target_id != actor.id, DenyReason::CannotChangeOwnRole))
            .and_then(|_| require(*target_role != Role::Admin, DenyReason::CannotChangeAdminRole)),

        Operation::CreatePoll => require(is_faculty, DenyReason::FacultyOnlyCreate),

        Operation::ModifyPoll { owner } => require(is_faculty && *owner == actor.id, DenyReason::NotPollOwner),

        Operation::ViewOwnPolls => require(is_faculty, DenyReason::FacultyOnlyOwnPolls),

        Operation::ViewPoll { owner, votable } => match actor.role {
            Role::Admin => Ok(()),
            Role::Faculty => require(*owner == actor.id, DenyReason::NotPollOwner),
            Role::Student => require(*votable, DenyReason::PollNotOpen),
        },

        Operation::ViewResults { owner } => match actor.role {
            Role::Admin => Ok(()),
            Role::Faculty => require(*owner == actor.id, DenyReason::NotPollOwner),
            Role::Student => Err(DenyReason::StudentResultsRestricted),
        },

        Operation::ListVotablePolls | Operation::CastVote => {
            require(actor.role == Role::Student, DenyReason::StudentsOnly)
        }

        Operation::SubmitVote { votable, option_in_poll, already_voted } => {
            require(actor.role == Role::Student, DenyReason::StudentsOnly)
                .and_then(|_| require(*votable, DenyReason::PollNotOpen))
                .and_then(|_| require(*option_in_poll, DenyReason::OptionNotInPoll))
                .and_then(|_| require(!*already_voted, DenyReason::AlreadyVoted))
        }
    };

    match outcome {
        Ok(()) => Decision::Allow,
        Err(reason) => Decision::Deny(reason),
    }
}

/// `decide` for service code: a denial is logged and converted into its `ServiceError`.
pub fn enforce(actor: &Actor, op: Operation) -> Result<(), ServiceError> {
    let decision = decide(actor, &op);
    if let Decision::Deny(reason) = decision {
        warn!(actor = %actor.id, role = %actor.role, ?op, %reason, "Operation denied");
    }
    decision.into_result()
}
