mod admin;
mod donations;
mod mocks;
mod webhooks;
