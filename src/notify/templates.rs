//! Fixed plain-text email templates.

pub const VERIFICATION_SUBJECT: &str = "TaskManager Pro - Verify Your Email";

const REMINDER_SUBJECT_PREFIX: &str = "⏰ Task Reminder - ";

const SIGNATURE: &str = "Best regards,\n\
                         The TaskManager Pro Team\n\
                         taskmanagerai@gmail.com";

pub fn reminder_subject(task_title: &str) -> String {
    format!("{}{}", REMINDER_SUBJECT_PREFIX, task_title)
}

pub fn verification_body(username: &str, verification_code: &str) -> String {
    format!(
        "🎉 Welcome to TaskManager Pro, {username}!\n\n\
         Thank you for joining TaskManager Pro - your ultimate task management solution!\n\n\
         📧 EMAIL VERIFICATION REQUIRED\n\
         To complete your registration, please use this verification code:\n\n\
         🔐 VERIFICATION CODE: {verification_code}\n\n\
         ⏰ This code will expire in 10 minutes for security purposes.\n\n\
         Once verified, you'll be able to:\n\
         ✅ Create and manage your tasks\n\
         ✅ Set priorities and due dates\n\
         ✅ Track your productivity\n\n\
         If you didn't create this account, please ignore this email.\n\n\
         Happy task managing! 🚀\n\n\
         {signature}",
        signature = SIGNATURE,
    )
}

pub fn reminder_body(
    username: &str,
    task_title: &str,
    task_description: &str,
    due_date: &str,
    hours_until_due: i64,
) -> String {
    format!(
        "⏰ Task Reminder - TaskManager Pro\n\n\
         Hello {username},\n\n\
         This is a friendly reminder that one of your tasks is due soon!\n\n\
         📋 TASK DETAILS:\n\
         Title: {task_title}\n\
         Description: {task_description}\n\
         Due Date: {due_date}\n\
         ⏰ Time Remaining: {hours_until_due} hour(s)\n\n\
         🚨 Don't forget to complete this task before the deadline!\n\n\
         You can manage your tasks by logging into TaskManager Pro.\n\n\
         Stay productive! 💪\n\n\
         {signature}",
        signature = SIGNATURE,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verification_body_embeds_name_and_code() {
        let body = verification_body("alice", "123456");
        assert!(body.starts_with("🎉 Welcome to TaskManager Pro, alice!\n\n"));
        assert!(body.contains("🔐 VERIFICATION CODE: 123456\n"));
        assert!(body.ends_with("The TaskManager Pro Team\ntaskmanagerai@gmail.com"));
    }

    #[test]
    fn reminder_body_lists_task_details() {
        let body = reminder_body("alice", "Pay rent", "Transfer to landlord", "2026-06-01", 2);
        assert!(body.contains("Hello alice,\n"));
        assert!(body.contains("Title: Pay rent\n"));
        assert!(body.contains("Description: Transfer to landlord\n"));
        assert!(body.contains("Due Date: 2026-06-01\n"));
        assert!(body.contains("⏰ Time Remaining: 2 hour(s)\n"));
    }

    #[test]
    fn negative_hours_pass_through() {
        let body = reminder_body("alice", "Late", "", "yesterday", -5);
        assert!(body.contains("Time Remaining: -5 hour(s)"));
    }

    #[test]
    fn reminder_subject_carries_title() {
        assert_eq!(reminder_subject("Pay rent"), "⏰ Task Reminder - Pay rent");
    }
}
