mod academics;
mod activities;
mod assignments;
mod auth;
mod health_check;
mod helpers;
mod management;
mod social;
