pub mod client;
pub mod expense;
pub mod invoice;
pub mod leave;
pub mod proposal;
pub mod service;
pub mod settings;
pub mod team;
pub mod user;

// Re-export only the types we actually use
pub use client::{Client, ClientDetail, CreateClient, CreateProject, Project};
pub use expense::{CreateExpenseCategory, Expense, ExpenseCategory, ExpenseRow};
pub use invoice::{CreateInvoice, Invoice, InvoiceListRow, InvoicePayment, RecordPayment};
pub use leave::{
    AvailabilityCheck, CreateLeaveRequest, LeaveBalance, LeavePolicy, LeaveRequest,
    LeaveRequestRow, LeaveStatus, LeaveType,
};
pub use proposal::{CreateProposal, PaymentMilestone, Proposal, ProposalService};
pub use service::{CreateService, Service};
pub use settings::{
    ApiKeySettings, CompanyProfile, PaymentGatewaySettings, SlackSettings, UpdateApiKeys,
    UpdateCompanyProfile, UpdatePaymentGateway, UpdateSlackSettings,
};
pub use team::{
    CreateJobRole, CreateTeamMember, JobRole, OnboardingView, SalaryPayment, SalaryPaymentRow,
    TeamMember,
};
pub use user::{CreateUser, LoginRequest, User, UserResponse};
