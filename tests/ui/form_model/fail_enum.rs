use aarogyam::form::FormModel;

#[derive(FormModel)]
enum Gender {
    Male,
    Female,
    Other,
}

fn main() {}
