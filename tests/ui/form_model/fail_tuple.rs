use aarogyam::form::FormModel;

#[derive(FormModel)]
struct Pincode(String);

fn main() {}
